//! Pipeline driver
//!
//! Orchestrates decode -> build -> batch -> load over a full input
//! stream. A single record's decode failure increments a counter and is
//! skipped; a failed batch is counted and the run continues. Only a
//! collaborator failure at startup (destination unreachable) is fatal.
//!
//! The pipeline is a linear producer/consumer with synchronous
//! backpressure: batch submission blocks the decode loop until the batch
//! is accepted or exhausts its retries, bounding memory to one in-flight
//! batch plus the active decode buffer.

use crate::batch::BatchAccumulator;
use crate::config::PipelineConfig;
use crate::decode::{decoder_for, InputFormat, RawEvent};
use crate::load::{BatchState, LoadClient};
use crate::row::build_row;
use crate::sink::RowSink;
use evload_common::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Per-stream accounting, emitted as the final summary. Counters are
/// independent per input stream.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamSummary {
    /// Logical name of the stream, for diagnostics
    pub stream: String,
    pub records_seen: u64,
    pub decode_failures: u64,
    pub rows_inserted: u64,
    pub rows_failed: u64,
    pub batches_submitted: u64,
    pub batches_failed: u64,
}

/// Drives the whole pipeline for one or more input streams.
pub struct PipelineDriver {
    config: PipelineConfig,
    sink: Arc<dyn RowSink>,
}

impl PipelineDriver {
    /// Create a driver with explicit configuration and a destination
    /// sink. Configuration is validated up front.
    pub fn new(config: PipelineConfig, sink: Arc<dyn RowSink>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, sink })
    }

    /// Run the pipeline over one decoded record stream.
    pub async fn run_stream<I>(&self, name: &str, records: I) -> StreamSummary
    where
        I: Iterator<Item = Result<RawEvent>>,
    {
        let loader = LoadClient::new(
            self.sink.clone(),
            self.config.table.clone(),
            self.config.max_retries,
            self.config.backoff_base(),
        );
        let mut accumulator = BatchAccumulator::new(self.config.batch_size);
        let mut summary = StreamSummary {
            stream: name.to_string(),
            ..Default::default()
        };

        for record in records {
            summary.records_seen += 1;
            let event = match record {
                Ok(event) => event,
                Err(err) => {
                    summary.decode_failures += 1;
                    warn!(stream = name, error = %err, "skipping undecodable record");
                    continue;
                },
            };
            if accumulator.push(build_row(&event)) {
                self.flush(&loader, &mut accumulator, &mut summary).await;
                info!(
                    stream = name,
                    records = summary.records_seen,
                    "processed records so far"
                );
            }
        }

        // end-of-stream remainder goes through the same retry path
        if !accumulator.is_empty() {
            self.flush(&loader, &mut accumulator, &mut summary).await;
        }

        info!(
            stream = name,
            records_seen = summary.records_seen,
            decode_failures = summary.decode_failures,
            rows_inserted = summary.rows_inserted,
            rows_failed = summary.rows_failed,
            batches_submitted = summary.batches_submitted,
            batches_failed = summary.batches_failed,
            "stream complete"
        );
        summary
    }

    async fn flush(
        &self,
        loader: &LoadClient,
        accumulator: &mut BatchAccumulator,
        summary: &mut StreamSummary,
    ) {
        let batch = accumulator.drain();
        if batch.is_empty() {
            return;
        }
        summary.batches_submitted += 1;
        let outcome = loader.submit(batch).await;
        match outcome.state {
            BatchState::Inserted => summary.rows_inserted += outcome.rows as u64,
            _ => {
                summary.batches_failed += 1;
                summary.rows_failed += outcome.rows as u64;
            },
        }
    }

    /// Process one file. Failure to open the file is an error; decode
    /// failures within it are not.
    pub async fn run_file(&self, path: &Path, format: InputFormat) -> Result<StreamSummary> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let name = path.display().to_string();
        Ok(self.run_stream(&name, decoder_for(reader, format)).await)
    }

    /// Process files sequentially in listing order. Each file gets
    /// independent counters and batches. The destination is probed once
    /// up front; an unreachable store aborts the whole run.
    pub async fn run_files(&self, paths: &[PathBuf], format: InputFormat) -> Result<Vec<StreamSummary>> {
        self.sink.check_connectivity().await?;

        let mut summaries = Vec::with_capacity(paths.len());
        for path in paths {
            summaries.push(self.run_file(path, format).await?);
        }
        Ok(summaries)
    }
}
