//! Bounded log of recent trades.
//!
//! Keeps the last `capacity` trades; the oldest trade is evicted when a new
//! one arrives on a full log.

use openbook_core::{Price, TradeEvent};
use std::collections::VecDeque;

/// Lifetime counters of a trade log.
#[derive(Debug, Clone, Default)]
pub struct TradeLogStats {
    /// Trades pushed since creation.
    pub total_trades: u64,
    /// Trades evicted to respect the capacity.
    pub evicted_trades: u64,
    /// Trades dropped for a non-finite price or size.
    pub rejected_trades: u64,
    /// Volume pushed since creation.
    pub total_volume: f64,
}

/// Fixed-capacity ring of the most recent trades.
pub struct TradeLog {
    capacity: usize,
    trades: VecDeque<TradeEvent>,
    /// Running sums over the retained window.
    volume: f64,
    notional: f64,
    stats: TradeLogStats,
}

impl TradeLog {
    /// Create a log retaining at most `capacity` trades (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            trades: VecDeque::with_capacity(capacity),
            volume: 0.0,
            notional: 0.0,
            stats: TradeLogStats::default(),
        }
    }

    /// Record a trade, returning the evicted one if the log was full.
    ///
    /// Trades with a non-finite price or size are dropped and counted.
    pub fn push(&mut self, trade: TradeEvent) -> Option<TradeEvent> {
        if !trade.price.is_finite() || !trade.size.is_finite() {
            self.stats.rejected_trades += 1;
            return None;
        }
        let evicted = if self.trades.len() == self.capacity {
            let old = self.trades.pop_front();
            if let Some(old) = &old {
                self.volume -= old.size;
                self.notional -= old.price * old.size;
                self.stats.evicted_trades += 1;
            }
            old
        } else {
            None
        };

        self.volume += trade.size;
        self.notional += trade.price * trade.size;
        self.stats.total_trades += 1;
        self.stats.total_volume += trade.size;
        self.trades.push_back(trade);
        evicted
    }

    /// Most recent trade.
    pub fn latest(&self) -> Option<&TradeEvent> {
        self.trades.back()
    }

    /// Retained trades, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TradeEvent> {
        self.trades.iter()
    }

    /// Volume-weighted average price of the retained trades.
    pub fn vwap(&self) -> Option<f64> {
        if self.volume > 0.0 {
            Some(self.notional / self.volume)
        } else {
            None
        }
    }

    /// Highest retained trade price.
    pub fn high(&self) -> Option<f64> {
        self.trades
            .iter()
            .map(|t| Price::from(t.price))
            .max()
            .map(|p| p.into_inner())
    }

    /// Lowest retained trade price.
    pub fn low(&self) -> Option<f64> {
        self.trades
            .iter()
            .map(|t| Price::from(t.price))
            .min()
            .map(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lifetime counters.
    pub fn stats(&self) -> &TradeLogStats {
        &self.stats
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.trades.clear();
        self.volume = 0.0;
        self.notional = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_trade(ts_ms: i64, price: f64, size: f64) -> TradeEvent {
        TradeEvent { ts_ms, price, size }
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut log = TradeLog::new(3);
        for i in 0..5 {
            log.push(make_trade(i, 100.0 + i as f64, 1.0));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.iter().next().unwrap().ts_ms, 2);
        assert_eq!(log.latest().unwrap().ts_ms, 4);
        assert_eq!(log.stats().total_trades, 5);
        assert_eq!(log.stats().evicted_trades, 2);
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut log = TradeLog::new(1);
        assert!(log.push(make_trade(1, 10.0, 1.0)).is_none());
        let evicted = log.push(make_trade(2, 11.0, 1.0)).unwrap();
        assert_eq!(evicted.ts_ms, 1);
    }

    #[test]
    fn test_vwap_tracks_window() {
        let mut log = TradeLog::new(2);
        log.push(make_trade(1, 100.0, 1.0));
        log.push(make_trade(2, 110.0, 3.0));
        // (100 + 330) / 4
        assert_relative_eq!(log.vwap().unwrap(), 107.5);

        // Evicts the 100.0 trade: (330 + 120) / 4
        log.push(make_trade(3, 120.0, 1.0));
        assert_relative_eq!(log.vwap().unwrap(), 112.5, epsilon = 1e-9);
    }

    #[test]
    fn test_high_low() {
        let mut log = TradeLog::new(10);
        assert!(log.high().is_none());
        log.push(make_trade(1, 101.0, 1.0));
        log.push(make_trade(2, 99.5, 1.0));
        log.push(make_trade(3, 100.0, 1.0));
        assert_relative_eq!(log.high().unwrap(), 101.0);
        assert_relative_eq!(log.low().unwrap(), 99.5);
    }

    #[test]
    fn test_non_finite_trade_rejected() {
        let mut log = TradeLog::new(2);
        log.push(make_trade(1, 100.0, 1.0));
        assert!(log.push(make_trade(2, f64::NAN, 1.0)).is_none());
        assert!(log.push(make_trade(3, 101.0, f64::INFINITY)).is_none());
        assert_eq!(log.len(), 1);
        assert_eq!(log.stats().rejected_trades, 2);

        // The window rolls over cleanly once real trades evict the first one.
        log.push(make_trade(4, 102.0, 1.0));
        log.push(make_trade(5, 104.0, 1.0));
        assert_relative_eq!(log.vwap().unwrap(), 103.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = TradeLog::new(0);
        log.push(make_trade(1, 1.0, 1.0));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.len(), 1);
    }
}
