//! Evload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging bootstrap for the evload workspace.
//!
//! # Overview
//!
//! - **Error Handling**: the [`EvloadError`] taxonomy and [`Result`] alias
//! - **Logging**: `tracing` subscriber setup with console/file targets
//!
//! # Example
//!
//! ```no_run
//! use evload_common::{Result, EvloadError};
//! use evload_common::logging::{LogConfig, init_logging};
//!
//! fn start() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{EvloadError, Result};
