//! Concrete features.
//!
//! Roots read raw market events; derived features read other features. Each
//! type offers an `install` helper that registers it and wires its edges.

pub mod best_price;
pub mod last_trade;
pub mod mid_price;
pub mod spread;
pub mod volatility;

pub use best_price::{BestAsk, BestBid};
pub use last_trade::LastTradePrice;
pub use mid_price::MidPrice;
pub use spread::{RelativeSpread, Spread};
pub use volatility::{MidPriceVolatility, RollingVolatility};

pub const BEST_ASK: &str = "BestAsk";
pub const BEST_BID: &str = "BestBid";
pub const MID_PRICE: &str = "MidPrice";
pub const SPREAD: &str = "Spread";
pub const RELATIVE_SPREAD: &str = "RelativeSpread";
pub const LAST_TRADE_PRICE: &str = "LastTradePrice";
pub const MID_PRICE_VOLATILITY: &str = "MidPriceVolatility";
