//! Core data types for the openbook system.

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Price type with ordering support.
pub type Price = OrderedFloat<f64>;

/// Size/quantity type.
pub type Size = f64;

/// Convert a millisecond timestamp to a UTC datetime, if representable.
#[inline]
pub fn ts_to_datetime(ts_ms: TimestampMs) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ts_ms)
}

/// The value held by a feature.
///
/// `Undefined` is what every feature holds before its first computation and is
/// never represented by a sentinel number. A `Defined` value is always finite.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Value {
    #[default]
    Undefined,
    Defined(f64),
}

impl Value {
    /// Whether a value has been computed.
    #[inline]
    pub fn is_defined(self) -> bool {
        matches!(self, Value::Defined(_))
    }

    /// The numeric value, if defined.
    #[inline]
    pub fn get(self) -> Option<f64> {
        match self {
            Value::Defined(v) => Some(v),
            Value::Undefined => None,
        }
    }

    /// Whether `other` differs from `self` by more than `eps`.
    ///
    /// Any transition between undefined and defined counts as a change.
    pub fn differs_from(self, other: Value, eps: f64) -> bool {
        match (self, other) {
            (Value::Defined(a), Value::Defined(b)) => (a - b).abs() > eps,
            (Value::Undefined, Value::Undefined) => false,
            _ => true,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Defined(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        match v {
            Some(v) => Value::Defined(v),
            None => Value::Undefined,
        }
    }
}

impl From<Value> for Option<f64> {
    fn from(v: Value) -> Self {
        v.get()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Defined(v) => write!(f, "{}", v),
            Value::Undefined => f.write_str("undefined"),
        }
    }
}

/// A single price level of the order book.
///
/// Depth events carry a snapshot of the visible levels, not incremental
/// changes: the best price is read from the levels of the latest event alone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Level price.
    pub price: f64,
    /// Resting amount at this price; levels with zero amount are ignored.
    pub amount: Size,
}

impl PriceLevel {
    pub fn new(price: f64, amount: Size) -> Self {
        Self { price, amount }
    }
}

/// An order-book depth update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEvent {
    /// Sequence number of this update.
    pub seq: u64,
    /// Sequence number of the previous update, when the feed provides it.
    #[serde(default)]
    pub prev_seq: Option<u64>,
    /// Exchange timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Bid levels, in any order.
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Ask levels, in any order.
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
}

impl DepthEvent {
    /// Build a depth event carrying only the top of book.
    pub fn top(seq: u64, ts_ms: TimestampMs, best_bid: f64, best_ask: f64) -> Self {
        Self {
            seq,
            prev_seq: seq.checked_sub(1),
            ts_ms,
            bids: vec![PriceLevel::new(best_bid, 1.0)],
            asks: vec![PriceLevel::new(best_ask, 1.0)],
        }
    }

    /// Highest finite bid price with a positive amount.
    pub fn best_bid(&self) -> Option<f64> {
        self.bids
            .iter()
            .filter(|l| l.amount > 0.0 && l.price.is_finite())
            .map(|l| Price::from(l.price))
            .max()
            .map(|p| p.into_inner())
    }

    /// Lowest finite ask price with a positive amount.
    pub fn best_ask(&self) -> Option<f64> {
        self.asks
            .iter()
            .filter(|l| l.amount > 0.0 && l.price.is_finite())
            .map(|l| Price::from(l.price))
            .min()
            .map(|p| p.into_inner())
    }
}

/// A single trade (print) from the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Timestamp in milliseconds.
    pub ts_ms: TimestampMs,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: Size,
}

/// The kinds of raw event a root feature can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Depth,
    Trade,
}

/// A raw market event as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    Depth(DepthEvent),
    Trade(TradeEvent),
}

impl MarketEvent {
    /// Which subscription this event is routed to.
    #[inline]
    pub fn kind(&self) -> EventKind {
        match self {
            MarketEvent::Depth(_) => EventKind::Depth,
            MarketEvent::Trade(_) => EventKind::Trade,
        }
    }

    /// Event timestamp in milliseconds.
    #[inline]
    pub fn ts_ms(&self) -> TimestampMs {
        match self {
            MarketEvent::Depth(d) => d.ts_ms,
            MarketEvent::Trade(t) => t.ts_ms,
        }
    }

    /// Sequence number, for depth events.
    #[inline]
    pub fn seq(&self) -> Option<u64> {
        match self {
            MarketEvent::Depth(d) => Some(d.seq),
            MarketEvent::Trade(_) => None,
        }
    }
}

/// One reported (feature, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    /// Timestamp of the event whose cascade produced this value.
    pub ts_ms: TimestampMs,
    /// Sequence number of that event, if any.
    pub seq: Option<u64>,
    /// Feature name.
    pub feature: String,
    /// Feature value after the cascade.
    pub value: Value,
}

/// The feature values forwarded to the reporting sink after one cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ts_ms: TimestampMs,
    pub seq: Option<u64>,
    pub records: Vec<FeatureRecord>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the event's identity.
    pub fn for_event(event: &MarketEvent) -> Self {
        Self {
            ts_ms: event.ts_ms(),
            seq: event.seq(),
            records: Vec::new(),
        }
    }

    /// Append a record for `feature`.
    pub fn push(&mut self, feature: impl Into<String>, value: Value) {
        self.records.push(FeatureRecord {
            ts_ms: self.ts_ms,
            seq: self.seq,
            feature: feature.into(),
            value,
        });
    }

    /// Look up a feature's value in this snapshot.
    pub fn get(&self, feature: &str) -> Option<Value> {
        self.records
            .iter()
            .find(|r| r.feature == feature)
            .map(|r| r.value)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_value_default_is_undefined() {
        let v = Value::default();
        assert!(!v.is_defined());
        assert_eq!(v.get(), None);
        assert_ne!(v, Value::Defined(0.0));
    }

    #[test]
    fn test_value_differs_from() {
        assert!(Value::Undefined.differs_from(Value::Defined(0.0), 0.0));
        assert!(!Value::Undefined.differs_from(Value::Undefined, 0.0));
        assert!(!Value::Defined(1.0).differs_from(Value::Defined(1.0 + 1e-12), 1e-9));
        assert!(Value::Defined(1.0).differs_from(Value::Defined(1.1), 1e-9));
    }

    #[test]
    fn test_value_serializes_as_nullable_number() {
        assert_eq!(serde_json::to_string(&Value::Defined(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&Value::Undefined).unwrap(), "null");
        let v: Value = serde_json::from_str("null").unwrap();
        assert_eq!(v, Value::Undefined);
    }

    #[test]
    fn test_best_prices_skip_empty_levels() {
        let depth = DepthEvent {
            seq: 7,
            prev_seq: Some(6),
            ts_ms: 0,
            bids: vec![
                PriceLevel::new(99.0, 2.0),
                PriceLevel::new(100.5, 0.0),
                PriceLevel::new(100.0, 1.0),
            ],
            asks: vec![PriceLevel::new(101.0, 0.0), PriceLevel::new(102.0, 3.0)],
        };
        assert_relative_eq!(depth.best_bid().unwrap(), 100.0);
        assert_relative_eq!(depth.best_ask().unwrap(), 102.0);
    }

    #[test]
    fn test_best_prices_absent_side() {
        let depth = DepthEvent {
            seq: 1,
            prev_seq: None,
            ts_ms: 0,
            bids: vec![],
            asks: vec![PriceLevel::new(102.0, 1.0)],
        };
        assert!(depth.best_bid().is_none());
        assert!(depth.best_ask().is_some());
    }

    #[test]
    fn test_market_event_json_tagging() {
        let line = r#"{"type":"trade","ts_ms":1700000000000,"price":50000.5,"size":0.01}"#;
        let event: MarketEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.kind(), EventKind::Trade);
        assert_eq!(event.seq(), None);

        let line = r#"{"type":"depth","seq":3,"ts_ms":5,"bids":[{"price":1.0,"amount":2.0}]}"#;
        let event: MarketEvent = serde_json::from_str(line).unwrap();
        assert_eq!(event.kind(), EventKind::Depth);
        assert_eq!(event.seq(), Some(3));
    }

    #[test]
    fn test_snapshot_lookup() {
        let event = MarketEvent::Depth(DepthEvent::top(4, 1000, 100.0, 102.0));
        let mut snap = Snapshot::for_event(&event);
        snap.push("MidPrice", Value::Defined(101.0));
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.records[0].seq, Some(4));
        assert_eq!(snap.get("MidPrice"), Some(Value::Defined(101.0)));
        assert_eq!(snap.get("Spread"), None);
    }

    #[test]
    fn test_ts_to_datetime() {
        let dt = ts_to_datetime(1704067290500).unwrap();
        assert_eq!(dt.timestamp_millis(), 1704067290500);
    }
}
