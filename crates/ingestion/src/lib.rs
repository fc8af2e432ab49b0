//! Event ingestion for the openbook feature graph.
//!
//! This crate handles:
//! - The event-source contract the graph runner drains
//! - Replay of recorded JSON-lines market data
//! - Serializing events from feed threads onto the propagation thread
//! - A bounded log of recent trades

pub mod queue;
pub mod source;
pub mod trade_log;

pub use queue::{EventPublisher, EventQueue, QueueSource};
pub use source::{EventSource, ReplaySource};
pub use trade_log::{TradeLog, TradeLogStats};
