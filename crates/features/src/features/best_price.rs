//! Top-of-book roots.

use super::{BEST_ASK, BEST_BID};
use crate::feature::{Feature, FeatureId};
use crate::graph::FeatureGraph;
use openbook_core::{EventKind, MarketEvent, Result, Value};

const DEPTH: &[EventKind] = &[EventKind::Depth];

/// Store `price` if it differs from `slot`; a side missing from the update
/// leaves the stored price alone.
fn update_best(slot: &mut Value, price: Option<f64>) -> bool {
    match price {
        Some(px) if *slot != Value::Defined(px) => {
            *slot = Value::Defined(px);
            true
        }
        _ => false,
    }
}

/// Lowest ask price of the latest depth update.
#[derive(Debug, Default)]
pub struct BestAsk {
    value: Value,
}

impl BestAsk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register as a root.
    pub fn install(graph: &mut FeatureGraph) -> Result<FeatureId> {
        graph.register_feature(Self::new(), true)
    }
}

impl Feature for BestAsk {
    fn name(&self) -> &str {
        BEST_ASK
    }

    fn value(&self) -> Value {
        self.value
    }

    fn subscriptions(&self) -> &[EventKind] {
        DEPTH
    }

    fn on_raw_event(&mut self, event: &MarketEvent) -> bool {
        match event {
            MarketEvent::Depth(depth) => update_best(&mut self.value, depth.best_ask()),
            _ => false,
        }
    }
}

/// Highest bid price of the latest depth update.
#[derive(Debug, Default)]
pub struct BestBid {
    value: Value,
}

impl BestBid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register as a root.
    pub fn install(graph: &mut FeatureGraph) -> Result<FeatureId> {
        graph.register_feature(Self::new(), true)
    }
}

impl Feature for BestBid {
    fn name(&self) -> &str {
        BEST_BID
    }

    fn value(&self) -> Value {
        self.value
    }

    fn subscriptions(&self) -> &[EventKind] {
        DEPTH
    }

    fn on_raw_event(&mut self, event: &MarketEvent) -> bool {
        match event {
            MarketEvent::Depth(depth) => update_best(&mut self.value, depth.best_bid()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openbook_core::{DepthEvent, PriceLevel, TradeEvent};

    #[test]
    fn test_best_ask_reports_change_once() {
        let mut ask = BestAsk::new();
        assert_eq!(ask.value(), Value::Undefined);

        let event = MarketEvent::Depth(DepthEvent::top(1, 0, 100.0, 102.0));
        assert!(ask.on_raw_event(&event));
        assert_eq!(ask.value(), Value::Defined(102.0));
        assert!(!ask.on_raw_event(&event));
    }

    #[test]
    fn test_best_bid_ignores_missing_side_and_trades() {
        let mut bid = BestBid::new();
        bid.on_raw_event(&MarketEvent::Depth(DepthEvent::top(1, 0, 100.0, 102.0)));

        let asks_only = MarketEvent::Depth(DepthEvent {
            seq: 2,
            prev_seq: Some(1),
            ts_ms: 1,
            bids: vec![],
            asks: vec![PriceLevel::new(103.0, 1.0)],
        });
        assert!(!bid.on_raw_event(&asks_only));

        let trade = MarketEvent::Trade(TradeEvent {
            ts_ms: 2,
            price: 99.0,
            size: 1.0,
        });
        assert!(!bid.on_raw_event(&trade));
        assert_eq!(bid.value(), Value::Defined(100.0));
    }
}
