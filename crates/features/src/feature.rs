//! The unit of computation in a feature graph.

use openbook_core::{Error, EventKind, MarketEvent, Result, Value};
use std::fmt;

/// Handle to a feature registered in a [`FeatureGraph`](crate::FeatureGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub(crate) usize);

impl FeatureId {
    /// Registration index of this feature.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named quantity derived from market data or from other features.
///
/// Features are owned by exactly one graph once registered. The graph is the
/// only caller of [`recompute`](Feature::recompute) and
/// [`on_raw_event`](Feature::on_raw_event).
pub trait Feature: Send {
    /// Stable name, unique within a graph.
    fn name(&self) -> &str;

    /// Last computed value; `Undefined` before the first computation.
    fn value(&self) -> Value;

    /// Derive this feature's value from the current values of its parents.
    ///
    /// Must not touch anything except the feature's own state. Root features
    /// never have parents, so the default does nothing.
    fn recompute(&mut self, _parents: &ParentValues<'_>) -> Result<()> {
        Ok(())
    }

    /// Raw event kinds this feature consumes when registered as a root.
    fn subscriptions(&self) -> &[EventKind] {
        &[]
    }

    /// Update from a raw event; returns whether the visible value changed.
    fn on_raw_event(&mut self, _event: &MarketEvent) -> bool {
        false
    }
}

/// Read-only view of a feature's parents, handed to [`Feature::recompute`].
pub struct ParentValues<'a> {
    pub(crate) ids: &'a [FeatureId],
    pub(crate) names: &'a [String],
    pub(crate) values: &'a [Value],
}

impl<'a> ParentValues<'a> {
    /// Current value of parent `id`, or `None` if `id` is not a parent.
    pub fn get(&self, id: FeatureId) -> Option<Value> {
        if self.ids.contains(&id) {
            self.values.get(id.0).copied()
        } else {
            None
        }
    }

    /// Current value of the parent called `name`.
    pub fn by_name(&self, name: &str) -> Option<Value> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Value of parent `id`, failing the recompute of `feature` if it is not wired.
    pub fn require(&self, feature: &str, id: FeatureId) -> Result<Value> {
        self.get(id)
            .ok_or_else(|| Error::recompute(feature, format!("{} is not a parent", id)))
    }

    /// Parents as (name, value), in edge-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Value)> + 'a {
        let names = self.names;
        let values = self.values;
        self.ids
            .iter()
            .map(move |id| (names[id.0].as_str(), values[id.0]))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Wrap a computed number, rejecting non-finite results.
pub fn finite(feature: &str, v: f64) -> Result<Value> {
    if v.is_finite() {
        Ok(Value::Defined(v))
    } else {
        Err(Error::recompute(feature, format!("non-finite result {}", v)))
    }
}
