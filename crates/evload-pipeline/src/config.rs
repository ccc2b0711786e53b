//! Pipeline configuration
//!
//! One explicit struct passed into the driver's constructor; no ambient
//! global state. Connection settings and batching knobs live here.

use evload_common::{EvloadError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Pipeline Configuration Constants
// ============================================================================

/// Default number of rows per submitted batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default number of retries after a failed batch insert.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff base in seconds; the delay before retry n is
/// `base * 2^(n-1)`.
pub const DEFAULT_BACKOFF_BASE_SECS: u64 = 2;

/// Default destination store endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

/// Default destination table identifier.
pub const DEFAULT_TABLE: &str = "raw_events";

/// Default HTTP timeout in seconds for destination calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Rows buffered before a batch is submitted
    pub batch_size: usize,

    /// Retries per batch after the initial attempt
    pub max_retries: u32,

    /// Backoff base in seconds (doubles per retry)
    pub backoff_base_secs: u64,

    /// Destination store endpoint
    pub endpoint: String,

    /// Destination table identifier
    pub table: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_secs: DEFAULT_BACKOFF_BASE_SECS,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            table: DEFAULT_TABLE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl PipelineConfig {
    /// Create a builder for fluent configuration
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `EVLOAD_ENDPOINT`: Destination store endpoint
    /// - `EVLOAD_TABLE`: Destination table identifier
    /// - `EVLOAD_BATCH_SIZE`: Rows per batch
    /// - `EVLOAD_MAX_RETRIES`: Retries per batch
    /// - `EVLOAD_BACKOFF_BASE_SECS`: Backoff base in seconds
    /// - `EVLOAD_TIMEOUT_SECS`: HTTP timeout in seconds
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("EVLOAD_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(table) = std::env::var("EVLOAD_TABLE") {
            config.table = table;
        }
        if let Ok(size) = std::env::var("EVLOAD_BATCH_SIZE") {
            config.batch_size = size
                .parse()
                .map_err(|_| EvloadError::Config(format!("invalid EVLOAD_BATCH_SIZE: {}", size)))?;
        }
        if let Ok(retries) = std::env::var("EVLOAD_MAX_RETRIES") {
            config.max_retries = retries.parse().map_err(|_| {
                EvloadError::Config(format!("invalid EVLOAD_MAX_RETRIES: {}", retries))
            })?;
        }
        if let Ok(base) = std::env::var("EVLOAD_BACKOFF_BASE_SECS") {
            config.backoff_base_secs = base.parse().map_err(|_| {
                EvloadError::Config(format!("invalid EVLOAD_BACKOFF_BASE_SECS: {}", base))
            })?;
        }
        if let Ok(timeout) = std::env::var("EVLOAD_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                EvloadError::Config(format!("invalid EVLOAD_TIMEOUT_SECS: {}", timeout))
            })?;
        }

        Ok(config)
    }

    /// Backoff base as a duration
    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EvloadError::Config("batch_size must be at least 1".to_string()));
        }
        if self.endpoint.is_empty() {
            return Err(EvloadError::Config("endpoint must not be empty".to_string()));
        }
        if self.table.is_empty() {
            return Err(EvloadError::Config("table must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn backoff_base_secs(mut self, secs: u64) -> Self {
        self.config.backoff_base_secs = secs;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.config.table = table.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
