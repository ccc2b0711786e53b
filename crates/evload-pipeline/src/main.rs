//! Evload - raw-event normalization and batched-load tool

use anyhow::Result;
use clap::{Parser, ValueEnum};
use evload_common::logging::{init_logging, LogConfig, LogLevel};
use evload_pipeline::decode::{decoder_for, InputFormat};
use evload_pipeline::row::build_row;
use evload_pipeline::sink::{HttpSink, MemorySink, RowSink};
use evload_pipeline::{PipelineConfig, PipelineDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "evload")]
#[command(author, version, about = "Raw-event normalization and batched-load tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum FormatArg {
    /// Newline-delimited JSON objects
    #[default]
    Ndjson,
    /// One top-level JSON array, streamed element-by-element
    Array,
}

impl From<FormatArg> for InputFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Ndjson => InputFormat::Ndjson,
            FormatArg::Array => InputFormat::Array,
        }
    }
}

#[derive(Parser, Debug)]
enum Command {
    /// Normalize input files and load them into the destination store
    Load {
        /// Input files, processed sequentially in listing order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Input shape
        #[arg(long, value_enum, default_value_t = FormatArg::Ndjson)]
        format: FormatArg,

        /// Destination store endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Destination table identifier
        #[arg(long)]
        table: Option<String>,

        /// Rows per batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Retries per batch after the initial attempt
        #[arg(long)]
        max_retries: Option<u32>,

        /// Build rows but keep them in memory instead of inserting
        #[arg(long)]
        dry_run: bool,
    },

    /// Decode and build rows without loading, reporting counts
    Inspect {
        /// Input file
        file: PathBuf,

        /// Input shape
        #[arg(long, value_enum, default_value_t = FormatArg::Ndjson)]
        format: FormatArg,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("evload".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    match cli.command {
        Command::Load {
            files,
            format,
            endpoint,
            table,
            batch_size,
            max_retries,
            dry_run,
        } => {
            let mut config = PipelineConfig::from_env()?;
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            if let Some(table) = table {
                config.table = table;
            }
            if let Some(batch_size) = batch_size {
                config.batch_size = batch_size;
            }
            if let Some(max_retries) = max_retries {
                config.max_retries = max_retries;
            }

            let sink: Arc<dyn RowSink> = if dry_run {
                info!("dry run: rows will not be inserted");
                Arc::new(MemorySink::new())
            } else {
                Arc::new(HttpSink::from_config(&config)?)
            };

            let driver = PipelineDriver::new(config, sink)?;
            let summaries = driver.run_files(&files, format.into()).await?;

            let rows_inserted: u64 = summaries.iter().map(|s| s.rows_inserted).sum();
            let rows_failed: u64 = summaries.iter().map(|s| s.rows_failed).sum();
            info!(
                files = summaries.len(),
                rows_inserted, rows_failed, "all files processed"
            );
        },
        Command::Inspect { file, format } => {
            inspect(&file, format.into())?;
        },
    }

    Ok(())
}

/// Decode and build every record of one file without loading anything.
fn inspect(path: &Path, format: InputFormat) -> Result<()> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);

    let mut records_seen = 0u64;
    let mut decode_failures = 0u64;
    let mut rows_built = 0u64;

    for record in decoder_for(reader, format) {
        records_seen += 1;
        match record {
            Ok(event) => {
                let _row = build_row(&event);
                rows_built += 1;
            },
            Err(err) => {
                decode_failures += 1;
                warn!(error = %err, "undecodable record");
            },
        }
    }

    info!(
        stream = %path.display(),
        records_seen,
        decode_failures,
        rows_built,
        "inspection complete"
    );
    Ok(())
}
