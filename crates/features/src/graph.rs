//! Feature graph: registry and incremental propagation engine.
//!
//! Features are registered one at a time, wired with guarded parent -> child
//! edges, then driven by raw market events. One event produces one cascade:
//! roots update from the raw data, guards on their out-edges decide which
//! children are dirty, and dirty features recompute exactly once each, in
//! topological order, so a feature with several changed parents only runs after
//! all of them have settled.

use crate::feature::{Feature, FeatureId, ParentValues};
use crate::guard::Guard;
use openbook_core::{Error, EventKind, MarketEvent, Result, Snapshot, Value};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};
use tracing::{debug, trace, warn};

/// Outgoing edge of a parent.
struct Edge {
    child: FeatureId,
    guard: Guard,
}

/// What a single cascade touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cascade {
    /// Features refreshed from outside the graph (roots, or a notified parent).
    pub updated: Vec<FeatureId>,
    /// Features recomputed, in evaluation order.
    pub recomputed: Vec<FeatureId>,
    /// Updated features plus the recomputed ones whose value moved.
    pub changed: Vec<FeatureId>,
}

impl Cascade {
    /// Whether `id` was recomputed in this cascade.
    pub fn was_recomputed(&self, id: FeatureId) -> bool {
        self.recomputed.contains(&id)
    }

    /// Whether the value of `id` differs from before the cascade.
    pub fn was_changed(&self, id: FeatureId) -> bool {
        self.changed.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.recomputed.is_empty()
    }
}

/// Registry of features and the engine propagating changes between them.
#[derive(Default)]
pub struct FeatureGraph {
    features: Vec<Box<dyn Feature>>,
    /// Names, values and flags indexed like `features`.
    names: Vec<String>,
    values: Vec<Value>,
    is_root: Vec<bool>,
    by_name: HashMap<String, FeatureId>,
    /// parent -> guarded child edges.
    children: Vec<Vec<Edge>>,
    /// child -> parents, in insertion order.
    parents: Vec<Vec<FeatureId>>,
    /// Roots to drive for each raw event kind.
    subscribers: BTreeMap<EventKind, Vec<FeatureId>>,
    /// Position of each feature in the topological order.
    rank: Vec<usize>,
    order_stale: bool,
}

impl FeatureGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature under its name.
    ///
    /// Roots are subscribed to the event kinds the feature declares.
    pub fn register_feature<F: Feature + 'static>(
        &mut self,
        feature: F,
        is_root: bool,
    ) -> Result<FeatureId> {
        self.register_boxed(Box::new(feature), is_root)
    }

    /// Register an already boxed feature.
    pub fn register_boxed(&mut self, feature: Box<dyn Feature>, is_root: bool) -> Result<FeatureId> {
        let name = feature.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::DuplicateName(name));
        }

        let id = FeatureId(self.features.len());
        if is_root {
            for &kind in feature.subscriptions() {
                self.subscribers.entry(kind).or_default().push(id);
            }
        } else if !feature.subscriptions().is_empty() {
            warn!(feature = %name, "Subscriptions of a non-root feature are ignored");
        }

        self.values.push(feature.value());
        self.features.push(feature);
        self.is_root.push(is_root);
        self.children.push(Vec::new());
        self.parents.push(Vec::new());
        self.rank.push(id.0);
        self.by_name.insert(name.clone(), id);
        self.names.push(name);
        self.order_stale = true;

        debug!(feature = %self.names[id.0], %id, is_root, "Feature registered");
        Ok(id)
    }

    /// Declare that `child` depends on `parent`, gated by `guard`.
    ///
    /// Rejects unknown endpoints, edges closing a cycle, repeated edges, and
    /// parents for root features. A rejected edge leaves the graph untouched.
    pub fn add_edge(&mut self, child: FeatureId, parent: FeatureId, guard: Guard) -> Result<()> {
        self.check_id(child)?;
        self.check_id(parent)?;
        let (c, p) = (child.0, parent.0);

        if c == p || self.reaches(c, p) {
            return Err(Error::Cycle {
                child: self.names[c].clone(),
                parent: self.names[p].clone(),
            });
        }
        if self.is_root[c] {
            return Err(Error::topology(format!(
                "{} is a root and cannot depend on {}",
                self.names[c], self.names[p]
            )));
        }
        if self.children[p].iter().any(|e| e.child == child) {
            return Err(Error::DuplicateEdge {
                child: self.names[c].clone(),
                parent: self.names[p].clone(),
            });
        }

        self.children[p].push(Edge { child, guard });
        self.parents[c].push(parent);
        self.order_stale = true;

        debug!(parent = %self.names[p], child = %self.names[c], "Edge added");
        Ok(())
    }

    /// Check that every feature is either a root or has a parent.
    pub fn validate(&self) -> Result<()> {
        for idx in 0..self.features.len() {
            let name = &self.names[idx];
            if self.is_root[idx] {
                if self.features[idx].subscriptions().is_empty() {
                    warn!(feature = %name, "Root feature subscribes to no events");
                }
            } else if self.parents[idx].is_empty() {
                return Err(Error::topology(format!(
                    "{} is not a root and has no parents",
                    name
                )));
            }
        }
        self.topological_order()?;
        Ok(())
    }

    /// Propagate a change of `parent` to its descendants.
    pub fn notify_parent_updated(&mut self, parent: FeatureId) -> Result<Cascade> {
        self.check_id(parent)?;
        self.values[parent.0] = self.features[parent.0].value();

        let cascade = Cascade {
            updated: vec![parent],
            recomputed: Vec::new(),
            changed: vec![parent],
        };
        self.propagate(&[parent], cascade)
    }

    /// Drive the roots subscribed to this event's kind and run the cascade.
    pub fn on_raw_market_event(&mut self, event: &MarketEvent) -> Result<Cascade> {
        let mut cascade = Cascade::default();

        if let Some(subscribers) = self.subscribers.get(&event.kind()) {
            for &id in subscribers {
                let feature = &mut self.features[id.0];
                if feature.on_raw_event(event) {
                    self.values[id.0] = feature.value();
                    cascade.updated.push(id);
                    cascade.changed.push(id);
                }
            }
        }

        if cascade.updated.is_empty() {
            trace!(kind = ?event.kind(), "No root changed");
            return Ok(cascade);
        }
        let seeds = cascade.updated.clone();
        self.propagate(&seeds, cascade)
    }

    /// Run one cascade from already-refreshed `seeds`.
    fn propagate(&mut self, seeds: &[FeatureId], mut cascade: Cascade) -> Result<Cascade> {
        if self.order_stale {
            self.rebuild_ranks()?;
        }

        let mut queued = vec![false; self.features.len()];
        let mut dirty: BinaryHeap<Reverse<(usize, usize)>> = BinaryHeap::new();
        for id in seeds {
            if !queued[id.0] {
                queued[id.0] = true;
                dirty.push(Reverse((self.rank[id.0], id.0)));
            }
        }
        let is_seed = queued.clone();

        while let Some(Reverse((_, idx))) = dirty.pop() {
            if !is_seed[idx] {
                let moved = self.recompute_one(idx)?;
                cascade.recomputed.push(FeatureId(idx));
                if moved {
                    cascade.changed.push(FeatureId(idx));
                }
            }

            // Every out-edge guard sees every refresh, even for children already
            // queued, so guards caching the parent value stay current.
            let parent = self.features[idx].as_ref();
            for edge in self.children[idx].iter_mut() {
                let c = edge.child.0;
                if edge.guard.check(parent) {
                    if !queued[c] {
                        queued[c] = true;
                        dirty.push(Reverse((self.rank[c], c)));
                    }
                } else {
                    trace!(parent = %self.names[idx], child = %self.names[c], "Guard held");
                }
            }
        }

        debug!(
            updated = cascade.updated.len(),
            recomputed = cascade.recomputed.len(),
            "Cascade complete"
        );
        Ok(cascade)
    }

    /// Recompute one feature; returns whether its value moved.
    fn recompute_one(&mut self, idx: usize) -> Result<bool> {
        let parents = ParentValues {
            ids: &self.parents[idx],
            names: &self.names,
            values: &self.values,
        };
        let feature = &mut self.features[idx];

        feature.recompute(&parents).map_err(|e| match e {
            Error::Recompute { .. } => e,
            other => Error::recompute(self.names[idx].as_str(), other.to_string()),
        })?;

        let value = feature.value();
        if let Value::Defined(v) = value {
            if !v.is_finite() {
                return Err(Error::recompute(
                    self.names[idx].as_str(),
                    format!("non-finite value {}", v),
                ));
            }
        }
        let moved = self.values[idx] != value;
        self.values[idx] = value;
        trace!(feature = %self.names[idx], %value, moved, "Recomputed");
        Ok(moved)
    }

    /// Features in dependency order, ties broken by registration order.
    pub fn topological_order(&self) -> Result<Vec<FeatureId>> {
        let n = self.features.len();
        let mut indegree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..n).filter(|&i| indegree[i] == 0).map(Reverse).collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(FeatureId(idx));
            for edge in &self.children[idx] {
                let c = edge.child.0;
                indegree[c] -= 1;
                if indegree[c] == 0 {
                    ready.push(Reverse(c));
                }
            }
        }

        if order.len() != n {
            return Err(Error::topology("dependency cycle among registered features"));
        }
        Ok(order)
    }

    fn rebuild_ranks(&mut self) -> Result<()> {
        let order = self.topological_order()?;
        for (rank, id) in order.iter().enumerate() {
            self.rank[id.0] = rank;
        }
        self.order_stale = false;
        Ok(())
    }

    /// Whether `to` is reachable from `from` along parent -> child edges.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.features.len()];
        let mut stack = vec![from];
        while let Some(idx) = stack.pop() {
            if idx == to {
                return true;
            }
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            stack.extend(self.children[idx].iter().map(|e| e.child.0));
        }
        false
    }

    fn check_id(&self, id: FeatureId) -> Result<()> {
        if id.0 < self.features.len() {
            Ok(())
        } else {
            Err(Error::UnknownFeature(id.to_string()))
        }
    }

    /// Resolve a feature name.
    pub fn feature_id(&self, name: &str) -> Result<FeatureId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownFeature(name.to_string()))
    }

    /// Name of a registered feature.
    pub fn name(&self, id: FeatureId) -> Option<&str> {
        self.names.get(id.0).map(String::as_str)
    }

    /// Current value of a registered feature.
    pub fn value(&self, id: FeatureId) -> Option<Value> {
        self.values.get(id.0).copied()
    }

    /// Current value of the feature called `name`.
    pub fn value_of(&self, name: &str) -> Result<Value> {
        let id = self.feature_id(name)?;
        Ok(self.values[id.0])
    }

    /// Borrow a registered feature.
    pub fn feature(&self, id: FeatureId) -> Option<&dyn Feature> {
        self.features.get(id.0).map(|f| f.as_ref())
    }

    pub fn is_root(&self, id: FeatureId) -> bool {
        self.is_root.get(id.0).copied().unwrap_or(false)
    }

    /// Parents of `id`, in insertion order.
    pub fn parents_of(&self, id: FeatureId) -> &[FeatureId] {
        self.parents.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Children of `id`, in insertion order.
    pub fn children_of(&self, id: FeatureId) -> Vec<FeatureId> {
        self.children
            .get(id.0)
            .map(|edges| edges.iter().map(|e| e.child).collect())
            .unwrap_or_default()
    }

    /// Root features, in registration order.
    pub fn roots(&self) -> Vec<FeatureId> {
        (0..self.features.len())
            .filter(|&i| self.is_root[i])
            .map(FeatureId)
            .collect()
    }

    /// Registered feature names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Append every feature's current value.
    pub fn snapshot_all(&self, snapshot: &mut Snapshot) {
        for (name, value) in self.names.iter().zip(&self.values) {
            snapshot.push(name.as_str(), *value);
        }
    }

    /// Append the values of the features a cascade changed.
    pub fn snapshot_cascade(&self, cascade: &Cascade, snapshot: &mut Snapshot) {
        for &id in &cascade.changed {
            snapshot.push(self.names[id.0].as_str(), self.values[id.0]);
        }
    }
}
