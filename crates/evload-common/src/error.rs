//! Error types for evload

use thiserror::Error;

/// Result type alias for evload operations
pub type Result<T> = std::result::Result<T, EvloadError>;

/// Main error type for the evload pipeline.
///
/// Per-record errors (`Decode`, `Normalize`) are recovered locally by the
/// pipeline driver: they are counted and logged, never propagated. `Sink`
/// errors go through the batch retry machinery. `Config` and `Connect`
/// errors are fatal and abort the run.
#[derive(Error, Debug)]
pub enum EvloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON unit: {detail}; raw: {raw}")]
    Decode { detail: String, raw: String },

    #[error("unrecognized extended-scalar shape in field '{field}': {detail}")]
    Normalize { field: String, detail: String },

    #[error("destination rejected batch: {0}")]
    Sink(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot reach destination store: {0}")]
    Connect(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EvloadError {
    /// Decode failure carrying the offending raw text for diagnostics.
    pub fn decode(detail: impl Into<String>, raw: impl Into<String>) -> Self {
        EvloadError::Decode {
            detail: detail.into(),
            raw: raw.into(),
        }
    }

    /// Normalization failure for a named field.
    pub fn normalize(field: impl Into<String>, detail: impl Into<String>) -> Self {
        EvloadError::Normalize {
            field: field.into(),
            detail: detail.into(),
        }
    }
}
