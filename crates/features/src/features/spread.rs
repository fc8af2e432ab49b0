//! Spread features.

use super::{RELATIVE_SPREAD, SPREAD};
use crate::feature::{finite, Feature, FeatureId, ParentValues};
use crate::graph::FeatureGraph;
use crate::guard::Guard;
use openbook_core::{Error, Result, Value};

const BPS: f64 = 10_000.0;

/// best ask - best bid. Negative on a crossed book.
#[derive(Debug)]
pub struct Spread {
    ask: FeatureId,
    bid: FeatureId,
    value: Value,
}

impl Spread {
    pub fn new(ask: FeatureId, bid: FeatureId) -> Self {
        Self {
            ask,
            bid,
            value: Value::Undefined,
        }
    }

    /// Register with guards ignoring price moves of at most `epsilon`.
    pub fn install(
        graph: &mut FeatureGraph,
        ask: FeatureId,
        bid: FeatureId,
        epsilon: f64,
    ) -> Result<FeatureId> {
        let id = graph.register_feature(Self::new(ask, bid), false)?;
        graph.add_edge(id, ask, Guard::threshold(epsilon))?;
        graph.add_edge(id, bid, Guard::threshold(epsilon))?;
        Ok(id)
    }
}

impl Feature for Spread {
    fn name(&self) -> &str {
        SPREAD
    }

    fn value(&self) -> Value {
        self.value
    }

    fn recompute(&mut self, parents: &ParentValues<'_>) -> Result<()> {
        let ask = parents.require(SPREAD, self.ask)?;
        let bid = parents.require(SPREAD, self.bid)?;

        self.value = match (ask.get(), bid.get()) {
            (Some(ask), Some(bid)) => finite(SPREAD, ask - bid)?,
            _ => Value::Undefined,
        };
        Ok(())
    }
}

/// Spread over mid price, in basis points.
#[derive(Debug)]
pub struct RelativeSpread {
    mid: FeatureId,
    spread: FeatureId,
    value: Value,
}

impl RelativeSpread {
    pub fn new(mid: FeatureId, spread: FeatureId) -> Self {
        Self {
            mid,
            spread,
            value: Value::Undefined,
        }
    }

    pub fn install(graph: &mut FeatureGraph, mid: FeatureId, spread: FeatureId) -> Result<FeatureId> {
        let id = graph.register_feature(Self::new(mid, spread), false)?;
        graph.add_edge(id, mid, Guard::on_change())?;
        graph.add_edge(id, spread, Guard::on_change())?;
        Ok(id)
    }
}

impl Feature for RelativeSpread {
    fn name(&self) -> &str {
        RELATIVE_SPREAD
    }

    fn value(&self) -> Value {
        self.value
    }

    fn recompute(&mut self, parents: &ParentValues<'_>) -> Result<()> {
        let mid = parents.require(RELATIVE_SPREAD, self.mid)?;
        let spread = parents.require(RELATIVE_SPREAD, self.spread)?;

        self.value = match (mid.get(), spread.get()) {
            (Some(mid), _) if mid == 0.0 => {
                return Err(Error::recompute(RELATIVE_SPREAD, "mid price is zero"));
            }
            (Some(mid), Some(spread)) => finite(RELATIVE_SPREAD, spread / mid * BPS)?,
            _ => Value::Undefined,
        };
        Ok(())
    }
}
