//! Runner for the openbook feature graph.
//!
//! This crate handles:
//! - Building the configured graph through the builder registry
//! - Driving it from an event source, one cascade per event
//! - Forwarding snapshots to a reporting sink (CSV or log)

pub mod runner;
pub mod sink;

pub use runner::{GraphRunner, RunStats};
pub use sink::{open_sink, CsvSink, LogSink, ReportSink, CSV_HEADER};
