//! Destination store boundary
//!
//! The pipeline talks to the columnar store through [`RowSink`]:
//!
//! - **http**: production client for insertAll-style streaming inserts
//! - **memory**: in-process sink for dry runs and tests

pub mod http;
pub mod memory;

pub use http::HttpSink;
pub use memory::MemorySink;

use crate::row::OutputRow;
use async_trait::async_trait;
use evload_common::Result;
use serde::{Deserialize, Serialize};

/// Per-row error descriptor reported by the destination store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertFailure {
    /// Index of the offending row within the submitted batch, when the
    /// store reports one.
    #[serde(default)]
    pub index: Option<usize>,
    /// Destination-reported error detail.
    pub reason: String,
}

/// Destination store client.
///
/// `insert` returns per-row error descriptors; an empty list means the
/// whole batch was accepted. A non-empty list (or a transport error)
/// means the batch needs retry, and the batch is retried atomically:
/// at-least-once semantics with idempotent replays.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Verify the destination is reachable. Called once at startup;
    /// failure is fatal to the run.
    async fn check_connectivity(&self) -> Result<()>;

    /// Submit one batch to the named table.
    async fn insert(&self, table: &str, rows: &[OutputRow]) -> Result<Vec<InsertFailure>>;
}
