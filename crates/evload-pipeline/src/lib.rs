//! Evload Pipeline Library
//!
//! Normalizes heterogeneous raw JSON event exports (carrying MongoDB
//! extended-JSON type wrappers) into a flat, strongly-typed row schema
//! and bulk-loads it into a columnar destination store with bounded
//! memory, batching, and retry-with-backoff.
//!
//! # Components (dependency order, leaves first)
//!
//! - **decode**: NDJSON / streaming-array record decoding into [`RawEvent`]
//! - **extended**: extended-JSON scalar wrapper classification
//! - **normalize**: pure scalar normalization
//! - **row**: [`RawEvent`] to [`OutputRow`] flattening
//! - **batch**: bounded row accumulation
//! - **load**: retryable batch insertion
//! - **sink**: destination store boundary (HTTP and in-memory)
//! - **pipeline**: driver orchestrating the whole stream
//!
//! # Example
//!
//! ```no_run
//! use evload_pipeline::{PipelineConfig, PipelineDriver};
//! use evload_pipeline::decode::InputFormat;
//! use evload_pipeline::sink::HttpSink;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let sink = Arc::new(HttpSink::from_config(&config)?);
//!     let driver = PipelineDriver::new(config, sink)?;
//!     let summaries = driver
//!         .run_files(&[PathBuf::from("events.jsonl")], InputFormat::Ndjson)
//!         .await?;
//!     println!("inserted {} rows", summaries[0].rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod decode;
pub mod extended;
pub mod load;
pub mod normalize;
pub mod pipeline;
pub mod row;
pub mod sink;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use decode::{InputFormat, RawEvent};
pub use pipeline::{PipelineDriver, StreamSummary};
pub use row::OutputRow;
