//! End-to-end pipeline tests
//!
//! These tests drive the full decode -> build -> batch -> load path over
//! real temp files with stub sinks:
//! - batch boundaries and final-partial-batch handling
//! - malformed units amid well-formed ones
//! - failed batches not aborting the run
//! - array-shaped input streaming
//! - fatal connectivity failures

use async_trait::async_trait;
use evload_pipeline::decode::InputFormat;
use evload_pipeline::row::OutputRow;
use evload_pipeline::sink::{InsertFailure, MemorySink, RowSink};
use evload_pipeline::{PipelineConfig, PipelineDriver};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

fn event_line(n: usize) -> String {
    format!(
        concat!(
            "{{\"_id\": {{\"$oid\": \"507f1f77bcf86cd7994{:05}\"}}, ",
            "\"collection\": \"view_product_detail\", ",
            "\"time_stamp\": {{\"$numberInt\": \"{}\"}}, ",
            "\"ip\": \"203.0.113.{}\"}}"
        ),
        n,
        1700000000 + n,
        n % 255
    )
}

fn write_ndjson(count: usize) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    for n in 0..count {
        writeln!(file, "{}", event_line(n)).unwrap();
    }
    (dir, path)
}

fn config(batch_size: usize) -> PipelineConfig {
    PipelineConfig::builder().batch_size(batch_size).build()
}

#[tokio::test]
async fn test_2500_records_yield_three_batches() {
    let (_dir, path) = write_ndjson(2500);
    let sink = Arc::new(MemorySink::new());
    let driver = PipelineDriver::new(config(1000), sink.clone()).unwrap();

    let summaries = driver
        .run_files(&[path], InputFormat::Ndjson)
        .await
        .unwrap();

    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.records_seen, 2500);
    assert_eq!(summary.decode_failures, 0);
    assert_eq!(summary.rows_inserted, 2500);
    assert_eq!(summary.rows_failed, 0);
    assert_eq!(summary.batches_submitted, 3);
    assert_eq!(sink.batch_sizes(), vec![1000, 1000, 500]);
}

#[tokio::test]
async fn test_malformed_line_amid_well_formed_ones() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    for n in 0..5 {
        if n == 2 {
            writeln!(file, "{{this is not json").unwrap();
        } else {
            writeln!(file, "{}", event_line(n)).unwrap();
        }
    }

    let sink = Arc::new(MemorySink::new());
    let driver = PipelineDriver::new(config(1000), sink.clone()).unwrap();
    let summary = driver.run_file(&path, InputFormat::Ndjson).await.unwrap();

    assert_eq!(summary.records_seen, 5);
    assert_eq!(summary.decode_failures, 1);
    assert_eq!(summary.rows_inserted, 4);
    assert_eq!(sink.row_count(), 4);
}

#[tokio::test]
async fn test_array_input_streams_in_batches() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(file, "[").unwrap();
    for n in 0..1500 {
        if n > 0 {
            write!(file, ",").unwrap();
        }
        write!(file, "{}", event_line(n)).unwrap();
    }
    write!(file, "]").unwrap();

    let sink = Arc::new(MemorySink::new());
    let driver = PipelineDriver::new(config(1000), sink.clone()).unwrap();
    let summary = driver.run_file(&path, InputFormat::Array).await.unwrap();

    assert_eq!(summary.records_seen, 1500);
    assert_eq!(summary.rows_inserted, 1500);
    assert_eq!(sink.batch_sizes(), vec![1000, 500]);

    // rows made it through normalization intact
    let rows = sink.rows();
    assert_eq!(
        rows[0].event_collection.as_deref(),
        Some("view_product_detail")
    );
    assert!(rows[0].record_id.is_some());
}

/// Fails the first `failures` insert calls, then accepts everything.
struct FailFirstAttemptsSink {
    failures: u32,
    attempts: AtomicU32,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FailFirstAttemptsSink {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RowSink for FailFirstAttemptsSink {
    async fn check_connectivity(&self) -> evload_common::Result<()> {
        Ok(())
    }

    async fn insert(
        &self,
        _table: &str,
        rows: &[OutputRow],
    ) -> evload_common::Result<Vec<InsertFailure>> {
        self.batch_sizes.lock().unwrap().push(rows.len());
        let seen = self.attempts.fetch_add(1, Ordering::SeqCst);
        if seen < self.failures {
            Ok(vec![InsertFailure {
                index: Some(0),
                reason: "quota exceeded".to_string(),
            }])
        } else {
            Ok(Vec::new())
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_does_not_abort_the_stream() {
    let (_dir, path) = write_ndjson(2000);
    // with max_retries = 3, four failed calls burn exactly one batch
    let sink = Arc::new(FailFirstAttemptsSink::new(4));
    let driver = PipelineDriver::new(config(1000), sink.clone()).unwrap();

    let summary = driver.run_file(&path, InputFormat::Ndjson).await.unwrap();

    assert_eq!(summary.batches_submitted, 2);
    assert_eq!(summary.batches_failed, 1);
    assert_eq!(summary.rows_failed, 1000);
    assert_eq!(summary.rows_inserted, 1000);

    // first batch retried atomically: same 1000 rows on every attempt
    let sizes = sink.batch_sizes.lock().unwrap().clone();
    assert_eq!(sizes, vec![1000, 1000, 1000, 1000, 1000]);
}

struct UnreachableSink;

#[async_trait]
impl RowSink for UnreachableSink {
    async fn check_connectivity(&self) -> evload_common::Result<()> {
        Err(evload_common::EvloadError::Connect(
            "connection refused".to_string(),
        ))
    }

    async fn insert(
        &self,
        _table: &str,
        _rows: &[OutputRow],
    ) -> evload_common::Result<Vec<InsertFailure>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_unreachable_destination_is_fatal() {
    let (_dir, path) = write_ndjson(10);
    let driver = PipelineDriver::new(config(1000), Arc::new(UnreachableSink)).unwrap();

    let result = driver.run_files(&[path], InputFormat::Ndjson).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_files_are_processed_independently() {
    let (_dir_a, path_a) = write_ndjson(30);
    let (_dir_b, path_b) = write_ndjson(70);
    let sink = Arc::new(MemorySink::new());
    let driver = PipelineDriver::new(config(50), sink.clone()).unwrap();

    let summaries = driver
        .run_files(&[path_a, path_b], InputFormat::Ndjson)
        .await
        .unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].records_seen, 30);
    assert_eq!(summaries[0].batches_submitted, 1);
    assert_eq!(summaries[1].records_seen, 70);
    assert_eq!(summaries[1].batches_submitted, 2);
    // no shared buffer: the second file's first batch is full-sized
    assert_eq!(sink.batch_sizes(), vec![30, 50, 20]);
}
