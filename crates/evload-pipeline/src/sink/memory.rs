//! In-memory sink for dry runs and tests

use super::{InsertFailure, RowSink};
use crate::row::OutputRow;
use async_trait::async_trait;
use evload_common::Result;
use std::sync::Mutex;

/// Accepts every batch and retains rows in memory. Backs `--dry-run`.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<OutputRow>>,
    batch_sizes: Mutex<Vec<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn rows(&self) -> Vec<OutputRow> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    async fn check_connectivity(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, _table: &str, rows: &[OutputRow]) -> Result<Vec<InsertFailure>> {
        self.batch_sizes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(rows.len());
        self.rows
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(rows);
        Ok(Vec::new())
    }
}
