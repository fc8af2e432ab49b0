//! Core types and configuration for the openbook feature graph.
//!
//! This crate provides shared types used across all other crates:
//! - Market events (depth updates, trades)
//! - Feature values and the records reported for them
//! - Configuration structures
//! - The common error taxonomy

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    Config, FeedConfig, GraphConfig, ReportConfig, ReportMode, RuntimeConfig, SinkKind,
};
pub use error::{Error, Result};
pub use types::*;
