//! HTTP destination store client
//!
//! Speaks an insertAll-style streaming-insert protocol: one POST per
//! batch, the response body carrying per-row error descriptors (empty on
//! full success).

use super::{InsertFailure, RowSink};
use crate::config::PipelineConfig;
use crate::row::OutputRow;
use async_trait::async_trait;
use evload_common::{EvloadError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct InsertRequest<'a> {
    rows: &'a [OutputRow],
}

#[derive(Deserialize)]
struct InsertResponse {
    #[serde(default)]
    insert_errors: Vec<InsertFailure>,
}

/// HTTP client for the destination store.
pub struct HttpSink {
    client: Client,
    base_url: String,
}

impl HttpSink {
    /// Create a new sink against the given endpoint.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("evload/0.1")
            .build()
            .map_err(|e| EvloadError::Config(e.to_string()))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }

    fn insert_url(&self, table: &str) -> String {
        format!("{}/tables/{}/insertAll", self.base_url, table)
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.base_url)
    }
}

#[async_trait]
impl RowSink for HttpSink {
    async fn check_connectivity(&self) -> Result<()> {
        let response = self
            .client
            .get(self.health_url())
            .send()
            .await
            .map_err(|e| EvloadError::Connect(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EvloadError::Connect(format!(
                "health check returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn insert(&self, table: &str, rows: &[OutputRow]) -> Result<Vec<InsertFailure>> {
        debug!(table, rows = rows.len(), "submitting batch");

        let response = self
            .client
            .post(self.insert_url(table))
            .json(&InsertRequest { rows })
            .send()
            .await
            .map_err(|e| EvloadError::Sink(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EvloadError::Sink(format!(
                "insert returned {}",
                response.status()
            )));
        }

        let body: InsertResponse = response
            .json()
            .await
            .map_err(|e| EvloadError::Sink(e.to_string()))?;

        Ok(body.insert_errors)
    }
}
