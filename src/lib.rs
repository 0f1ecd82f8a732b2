//! # fetch-report
//!
//! Reads a line-delimited list of URLs, fetches each one over HTTP with a
//! fixed pool of concurrent workers and prints a table with the completion
//! time, status code, body size and error (if any) of every URL.
//!
//! ## Pipeline
//!
//! | Stage | Module | Role |
//! |-------|--------|------|
//! | **URL source** | `source` | Streams trimmed lines into a bounded channel |
//! | **Worker pool** | `worker` | `pool_size` tasks draining the channel |
//! | **Fetch client** | `fetch` | Injected GET capability (reqwest or stub) |
//! | **Report writer** | `report` | Mutex-guarded sink, one row at a time |
//! | **Orchestrator** | `runner` | Validation, wiring, join and flush |
//!
//! The work channel has a capacity equal to the pool size, so the source
//! waits whenever every worker is busy. One `CancellationToken` is checked
//! before each URL is enqueued and before each URL is fetched. A request
//! already in flight is never interrupted.
//!
//! ## Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Zero pool size, empty path | `ConfigurationError`, nothing started |
//! | Input file cannot be opened or read | `IoError`, run aborted, no report |
//! | Malformed URL, connect/timeout/body failure | Error row in the report |
//! | Report write failure | Logged, the pool keeps going |
//!
//! Non-2xx responses are not failures: the status code is reported as is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fetch_report::{run, Config, HttpFetchClient, ReportWriter};
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config { pool_size: 10, ..Default::default() };
//!     let client = Arc::new(HttpFetchClient::new(&config)?);
//!     let report = Arc::new(ReportWriter::new(std::io::stdout(), config.format));
//!
//!     let summary = run(
//!         CancellationToken::new(),
//!         &config,
//!         Path::new("urls.txt"),
//!         client,
//!         report,
//!     )
//!     .await?;
//!     println!("{} URLs processed", summary.processed);
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! fetch-report -f urls.txt
//! fetch-report -f urls.txt --workers 20 --timeout 10 --format tsv
//! ```

/// Run configuration and the per-URL record type
pub mod config;

/// Error taxonomy shared by every stage
pub mod error;

/// HTTP fetch capability and its implementations
pub mod fetch;

/// Line-delimited URL source
pub mod source;

/// Mutex-guarded tabular report writer
pub mod report;

/// Worker pool draining the URL channel
pub mod worker;

/// Orchestration of source, pool and writer
pub mod runner;

/// Command-line interface implementation
pub mod cli;

/// Metric handles, worker counters and run summary
pub mod stats;

/// Utility functions and helpers
pub mod utils;


pub use cli::*;
pub use config::*;
pub use error::*;
pub use fetch::*;
pub use report::*;
pub use runner::*;
pub use source::*;
pub use stats::*;
pub use utils::*;
pub use worker::*;
