//! Configuration structures for the openbook system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which graph builder to instantiate.
    pub graph: GraphConfig,
    /// Event feed configuration.
    pub feed: FeedConfig,
    /// Reporting sink configuration.
    pub report: ReportConfig,
    /// Runtime error policy.
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("invalid configuration: {}", e)))?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.graph.builder.trim().is_empty() {
            return Err(Error::config("graph.builder must name a builder"));
        }
        if !(self.graph.params.is_object() || self.graph.params.is_null()) {
            return Err(Error::config("graph.params must be a JSON object"));
        }
        if self.feed.queue_capacity == 0 {
            return Err(Error::config("feed.queue_capacity must be positive"));
        }
        if self.feed.trade_log_capacity == 0 {
            return Err(Error::config("feed.trade_log_capacity must be positive"));
        }
        if self.report.flush_every_rows == 0 {
            return Err(Error::config("report.flush_every_rows must be positive"));
        }
        Ok(())
    }
}

/// Graph assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Registry id of the builder (e.g., "mid_price").
    pub builder: String,
    /// Builder-specific parameters, interpreted by the builder itself.
    pub params: serde_json::Value,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            builder: "mid_price".to_string(),
            params: serde_json::Value::Null,
        }
    }
}

/// Event feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Endpoint handed to the event source on connect.
    pub endpoint: String,
    /// Capacity of the queue serializing feed threads onto the graph.
    pub queue_capacity: usize,
    /// Number of recent trades kept in memory.
    pub trade_log_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://api.huobi.pro/ws".to_string(),
            queue_capacity: 10_000,
            trade_log_capacity: 1_000,
        }
    }
}

/// Reporting sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Rows appended to a CSV file under `reports_dir`.
    Csv,
    /// One log line per record.
    Log,
}

/// Which feature values are forwarded after each cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// Only features whose value changed in the cascade.
    Changed,
    /// Every registered feature.
    All,
}

/// Reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Sink kind.
    pub sink: SinkKind,
    /// Directory receiving report files; created on startup.
    pub reports_dir: PathBuf,
    /// Report file name; defaults to a timestamped name.
    pub file_name: Option<String>,
    /// Rows buffered before the CSV writer is flushed.
    pub flush_every_rows: usize,
    /// Changed-only or full snapshots.
    pub mode: ReportMode,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Csv,
            reports_dir: PathBuf::from("reports"),
            file_name: None,
            flush_every_rows: 100,
            mode: ReportMode::Changed,
        }
    }
}

/// Runtime error policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Stop the run on the first failed cascade instead of logging it.
    pub halt_on_recompute_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.graph.builder, "mid_price");
        assert_eq!(config.report.flush_every_rows, 100);
        assert_eq!(config.report.mode, ReportMode::Changed);
        assert!(!config.runtime.halt_on_recompute_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = Config::from_json_str(
            r#"{"graph":{"builder":"top_of_book","params":{"volatility_window":20}},
                "report":{"sink":"log","mode":"all"}}"#,
        )
        .unwrap();
        assert_eq!(config.graph.builder, "top_of_book");
        assert_eq!(config.graph.params["volatility_window"], 20);
        assert_eq!(config.report.sink, SinkKind::Log);
        assert_eq!(config.report.mode, ReportMode::All);
        assert_eq!(config.feed.trade_log_capacity, 1_000);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = Config::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_empty_builder() {
        let mut config = Config::default();
        config.graph.builder = "  ".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_capacities() {
        let mut config = Config::default();
        config.report.flush_every_rows = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.feed.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
