//! Rolling volatility of the mid price.

use super::MID_PRICE_VOLATILITY;
use crate::feature::{finite, Feature, FeatureId, ParentValues};
use crate::graph::FeatureGraph;
use crate::guard::Guard;
use openbook_core::{Result, Value};
use std::collections::VecDeque;

/// Standard deviation of log returns over the last `window` returns.
#[derive(Debug, Clone)]
pub struct RollingVolatility {
    window: usize,
    returns: VecDeque<f64>,
    prev_price: Option<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingVolatility {
    /// Windows shorter than two returns are widened to two.
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            returns: VecDeque::with_capacity(window),
            prev_price: None,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Add a price observation and return the updated volatility.
    ///
    /// Non-positive prices break the return series: the next positive price
    /// starts a new one.
    pub fn add_price(&mut self, price: f64) -> Option<f64> {
        if price <= 0.0 || !price.is_finite() {
            self.prev_price = None;
            return self.volatility();
        }
        if let Some(prev) = self.prev_price {
            self.push_return((price / prev).ln());
        }
        self.prev_price = Some(price);
        self.volatility()
    }

    fn push_return(&mut self, ret: f64) {
        if self.returns.len() == self.window {
            if let Some(old) = self.returns.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.returns.push_back(ret);
        self.sum += ret;
        self.sum_sq += ret * ret;
    }

    /// Population standard deviation, once at least two returns are known.
    pub fn volatility(&self) -> Option<f64> {
        let n = self.returns.len();
        if n < 2 {
            return None;
        }
        let n = n as f64;
        let mean = self.sum / n;
        let variance = self.sum_sq / n - mean * mean;
        // Running sums can dip just below zero.
        Some(variance.max(0.0).sqrt())
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_ready(&self) -> bool {
        self.returns.len() == self.window
    }

    pub fn count(&self) -> usize {
        self.returns.len()
    }

    pub fn clear(&mut self) {
        self.returns.clear();
        self.prev_price = None;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }
}

/// Rolling volatility fed by every change of the mid price.
#[derive(Debug)]
pub struct MidPriceVolatility {
    mid: FeatureId,
    rolling: RollingVolatility,
    value: Value,
}

impl MidPriceVolatility {
    pub fn new(mid: FeatureId, window: usize) -> Self {
        Self {
            mid,
            rolling: RollingVolatility::new(window),
            value: Value::Undefined,
        }
    }

    pub fn install(graph: &mut FeatureGraph, mid: FeatureId, window: usize) -> Result<FeatureId> {
        let id = graph.register_feature(Self::new(mid, window), false)?;
        graph.add_edge(id, mid, Guard::on_change())?;
        Ok(id)
    }

    pub fn window(&self) -> usize {
        self.rolling.window()
    }
}

impl Feature for MidPriceVolatility {
    fn name(&self) -> &str {
        MID_PRICE_VOLATILITY
    }

    fn value(&self) -> Value {
        self.value
    }

    fn recompute(&mut self, parents: &ParentValues<'_>) -> Result<()> {
        let mid = parents.require(MID_PRICE_VOLATILITY, self.mid)?;
        let Some(price) = mid.get() else {
            return Ok(());
        };
        self.value = match self.rolling.add_price(price) {
            Some(sigma) => finite(MID_PRICE_VOLATILITY, sigma)?,
            None => Value::Undefined,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BestAsk, BestBid, MidPrice};
    use approx::assert_relative_eq;
    use openbook_core::{DepthEvent, MarketEvent};

    #[test]
    fn test_not_ready() {
        let vol = RollingVolatility::new(240);
        assert!(!vol.is_ready());
        assert!(vol.volatility().is_none());
    }

    #[test]
    fn test_constant_price_is_zero() {
        let mut vol = RollingVolatility::new(5);
        for _ in 0..10 {
            vol.add_price(100.0);
        }
        assert!(vol.is_ready());
        assert_relative_eq!(vol.volatility().unwrap(), 0.0);
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut vol = RollingVolatility::new(3);
        for px in [100.0, 101.0, 102.0, 103.0, 104.0] {
            vol.add_price(px);
        }
        assert_eq!(vol.count(), 3);
    }

    #[test]
    fn test_known_volatility() {
        // Log returns 0.01, 0.02, 0.03: population std = sqrt(2/3) * 0.01.
        let mut vol = RollingVolatility::new(3);
        let mut px = 100.0_f64;
        vol.add_price(px);
        for r in [0.01, 0.02, 0.03] {
            px *= f64::exp(r);
            vol.add_price(px);
        }
        assert_relative_eq!(
            vol.volatility().unwrap(),
            (2.0_f64 / 3.0).sqrt() * 0.01,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_non_positive_price_restarts_series() {
        let mut vol = RollingVolatility::new(4);
        vol.add_price(100.0);
        vol.add_price(0.0);
        vol.add_price(101.0);
        assert_eq!(vol.count(), 0);
        assert_eq!(RollingVolatility::new(0).window(), 2);
    }

    #[test]
    fn test_mid_price_volatility_in_graph() {
        let mut graph = FeatureGraph::new();
        let ask = BestAsk::install(&mut graph).unwrap();
        let bid = BestBid::install(&mut graph).unwrap();
        let mid = MidPrice::install(&mut graph, ask, bid).unwrap();
        let vol = MidPriceVolatility::install(&mut graph, mid, 10).unwrap();
        graph.validate().unwrap();

        let book = [(99.0, 101.0), (100.0, 102.0), (99.0, 101.0)];
        for (seq, (bid_px, ask_px)) in book.into_iter().enumerate() {
            let event = MarketEvent::Depth(DepthEvent::top(seq as u64, 0, bid_px, ask_px));
            graph.on_raw_market_event(&event).unwrap();
        }

        let sigma = graph.value(vol).unwrap().get().unwrap();
        assert_relative_eq!(sigma, (101.0_f64 / 100.0).ln(), epsilon = 1e-12);
    }
}
