//! Retryable batch insertion
//!
//! One state machine per batch: `Pending -> Inserted` on success, or
//! `Pending -> Retrying(n)` for n = 1..max_retries with an exponential
//! backoff before each retry, then `Retrying(max_retries) -> Failed` if
//! the error persists. A failed batch is logged with its size and the
//! destination error detail; the pipeline proceeds to the next batch.

use crate::row::OutputRow;
use crate::sink::RowSink;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle of a submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    Retrying(u32),
    Inserted,
    Failed,
}

/// Outcome of one batch submission. `attempts` counts the initial
/// attempt plus retries.
#[derive(Debug)]
pub struct BatchOutcome {
    pub state: BatchState,
    pub rows: usize,
    pub attempts: u32,
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn inserted(&self) -> bool {
        self.state == BatchState::Inserted
    }
}

/// Submits batches to the destination store with bounded retry. The same
/// client handles bulk batches and the end-of-stream remainder.
pub struct LoadClient {
    sink: Arc<dyn RowSink>,
    table: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl LoadClient {
    pub fn new(
        sink: Arc<dyn RowSink>,
        table: impl Into<String>,
        max_retries: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            sink,
            table: table.into(),
            max_retries,
            backoff_base,
        }
    }

    /// Submit one batch, retrying the whole batch atomically on any
    /// reported insertion error.
    pub async fn submit(&self, rows: Vec<OutputRow>) -> BatchOutcome {
        let size = rows.len();
        let mut state = BatchState::Pending;
        let mut attempts = 0u32;
        debug!(batch_size = size, state = ?state, "submitting batch");

        loop {
            attempts += 1;
            match self.try_insert(&rows).await {
                Ok(()) => {
                    info!(batch_size = size, attempts, "batch inserted");
                    return BatchOutcome {
                        state: BatchState::Inserted,
                        rows: size,
                        attempts,
                        error: None,
                    };
                },
                Err(detail) => {
                    let retry = attempts;
                    if retry > self.max_retries {
                        error!(
                            batch_size = size,
                            retries = self.max_retries,
                            error = %detail,
                            "batch failed after exhausting retries"
                        );
                        return BatchOutcome {
                            state: BatchState::Failed,
                            rows: size,
                            attempts,
                            error: Some(detail),
                        };
                    }
                    state = BatchState::Retrying(retry);
                    // delay doubles per retry: base, 2*base, 4*base, ...
                    // saturates instead of overflowing for very high retry counts
                    let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
                    let delay = self.backoff_base.saturating_mul(factor);
                    warn!(
                        batch_size = size,
                        state = ?state,
                        max_retries = self.max_retries,
                        delay_secs = delay.as_secs_f64(),
                        error = %detail,
                        "batch insert failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                },
            }
        }
    }

    async fn try_insert(&self, rows: &[OutputRow]) -> std::result::Result<(), String> {
        match self.sink.insert(&self.table, rows).await {
            Ok(failures) if failures.is_empty() => Ok(()),
            Ok(failures) => Err(format!(
                "{} row error(s); first: {}",
                failures.len(),
                failures[0].reason
            )),
            Err(err) => Err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::RawEvent;
    use crate::row::build_row;
    use crate::sink::InsertFailure;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Fails the first `failures` insert attempts, then succeeds.
    struct FlakySink {
        failures: u32,
        attempts: AtomicU32,
        attempt_times: Mutex<Vec<Instant>>,
    }

    impl FlakySink {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                attempt_times: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RowSink for FlakySink {
        async fn check_connectivity(&self) -> evload_common::Result<()> {
            Ok(())
        }

        async fn insert(
            &self,
            _table: &str,
            _rows: &[OutputRow],
        ) -> evload_common::Result<Vec<InsertFailure>> {
            self.attempt_times.lock().unwrap().push(Instant::now());
            let seen = self.attempts.fetch_add(1, Ordering::SeqCst);
            if seen < self.failures {
                Ok(vec![InsertFailure {
                    index: Some(0),
                    reason: "stream buffer full".to_string(),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn rows(n: usize) -> Vec<OutputRow> {
        (0..n)
            .map(|_| build_row(&RawEvent::from_str("{}").unwrap()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_two_failures_with_doubling_backoff() {
        let sink = Arc::new(FlakySink::new(2));
        let client = LoadClient::new(sink.clone(), "raw_events", 3, Duration::from_secs(2));

        let outcome = client.submit(rows(10)).await;

        assert!(outcome.inserted());
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.rows, 10);

        // exactly two backoff delays: 1x and 2x the base unit
        let times = sink.attempt_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(2));
        assert_eq!(times[2] - times[1], Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_mark_batch_failed() {
        let sink = Arc::new(FlakySink::new(u32::MAX));
        let client = LoadClient::new(sink.clone(), "raw_events", 3, Duration::from_secs(2));

        let outcome = client.submit(rows(5)).await;

        assert_eq!(outcome.state, BatchState::Failed);
        // one initial attempt plus max_retries retries
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.error.as_deref().unwrap().contains("stream buffer full"));

        // the client is reusable for the next batch
        let next = client.submit(rows(5)).await;
        assert_eq!(next.state, BatchState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_high_retry_count_saturates_backoff() {
        // a doubling factor past 2^31 must saturate, not overflow
        let sink = Arc::new(FlakySink::new(u32::MAX));
        let client = LoadClient::new(sink.clone(), "raw_events", 40, Duration::from_secs(2));

        let outcome = client.submit(rows(1)).await;

        assert_eq!(outcome.state, BatchState::Failed);
        assert_eq!(outcome.attempts, 41);
    }

    #[tokio::test]
    async fn test_first_attempt_success_sleeps_never() {
        let sink = Arc::new(FlakySink::new(0));
        let client = LoadClient::new(sink.clone(), "raw_events", 3, Duration::from_secs(2));

        let outcome = client.submit(rows(1)).await;
        assert!(outcome.inserted());
        assert_eq!(outcome.attempts, 1);
    }
}
