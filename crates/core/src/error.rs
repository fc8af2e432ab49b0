//! Error types for the openbook system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the openbook system.
#[derive(Error, Debug)]
pub enum Error {
    /// A feature with this name is already registered.
    #[error("Duplicate feature name: {0}")]
    DuplicateName(String),

    /// An edge or lookup referenced a feature that was never registered.
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Adding the edge would close a directed cycle.
    #[error("Cycle: {child} already reaches {parent}, edge {parent} -> {child} rejected")]
    Cycle { child: String, parent: String },

    /// The same parent -> child edge was added twice.
    #[error("Duplicate edge: {parent} -> {child}")]
    DuplicateEdge { child: String, parent: String },

    /// The registered topology is inconsistent (orphans, roots with parents).
    #[error("Topology error: {0}")]
    Topology(String),

    /// A feature failed to recompute its value.
    #[error("Recompute error in {feature}: {reason}")]
    Recompute { feature: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No builder is registered under the configured id.
    #[error("Builder not found: {0}")]
    BuilderNotFound(String),

    /// Data error (invalid or malformed market data).
    #[error("Data error: {0}")]
    Data(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a topology error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Error::Topology(msg.into())
    }

    /// Create a recompute error for the named feature.
    pub fn recompute(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Recompute {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is scoped to a single event's cascade.
    ///
    /// Everything else is a build-time or startup failure.
    pub fn is_per_event(&self) -> bool {
        matches!(self, Error::Recompute { .. } | Error::Data(_))
    }
}
