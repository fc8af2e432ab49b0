//! Last traded price.

use super::LAST_TRADE_PRICE;
use crate::feature::{Feature, FeatureId};
use crate::graph::FeatureGraph;
use openbook_core::{EventKind, MarketEvent, Result, Value};

const TRADE: &[EventKind] = &[EventKind::Trade];

/// Price of the most recent trade print.
#[derive(Debug, Default)]
pub struct LastTradePrice {
    value: Value,
}

impl LastTradePrice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(graph: &mut FeatureGraph) -> Result<FeatureId> {
        graph.register_feature(Self::new(), true)
    }
}

impl Feature for LastTradePrice {
    fn name(&self) -> &str {
        LAST_TRADE_PRICE
    }

    fn value(&self) -> Value {
        self.value
    }

    fn subscriptions(&self) -> &[EventKind] {
        TRADE
    }

    fn on_raw_event(&mut self, event: &MarketEvent) -> bool {
        let MarketEvent::Trade(trade) = event else {
            return false;
        };
        if !trade.price.is_finite() || self.value == Value::Defined(trade.price) {
            return false;
        }
        self.value = Value::Defined(trade.price);
        true
    }
}
