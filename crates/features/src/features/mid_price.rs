//! Mid price.

use super::MID_PRICE;
use crate::feature::{finite, Feature, FeatureId, ParentValues};
use crate::graph::FeatureGraph;
use crate::guard::Guard;
use openbook_core::{Result, Value};

/// (best ask + best bid) / 2, undefined until both sides are known.
#[derive(Debug)]
pub struct MidPrice {
    ask: FeatureId,
    bid: FeatureId,
    value: Value,
}

impl MidPrice {
    pub fn new(ask: FeatureId, bid: FeatureId) -> Self {
        Self {
            ask,
            bid,
            value: Value::Undefined,
        }
    }

    /// Register and subscribe to both sides of the book.
    pub fn install(graph: &mut FeatureGraph, ask: FeatureId, bid: FeatureId) -> Result<FeatureId> {
        let id = graph.register_feature(Self::new(ask, bid), false)?;
        graph.add_edge(id, ask, Guard::on_change())?;
        graph.add_edge(id, bid, Guard::on_change())?;
        Ok(id)
    }
}

impl Feature for MidPrice {
    fn name(&self) -> &str {
        MID_PRICE
    }

    fn value(&self) -> Value {
        self.value
    }

    fn recompute(&mut self, parents: &ParentValues<'_>) -> Result<()> {
        let ask = parents.require(MID_PRICE, self.ask)?;
        let bid = parents.require(MID_PRICE, self.bid)?;

        self.value = match (ask.get(), bid.get()) {
            (Some(ask), Some(bid)) => finite(MID_PRICE, (ask + bid) / 2.0)?,
            _ => Value::Undefined,
        };
        Ok(())
    }
}
