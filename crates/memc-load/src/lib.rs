//! MemcLoad Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads gzip-compressed installed-apps logs into per-device-type memcached
//! instances.
//!
//! # Overview
//!
//! - **Parsing**: one tab-separated line into a [`memc_common::Record`] (`parser`)
//! - **Writing**: one writer per device type and file, fed by a bounded queue (`writer`)
//! - **Files**: decompress, scan, route and judge the error rate (`processor`, `outcome`)
//! - **Runs**: glob the inputs, fan out to a worker pool, mark files done (`driver`, `renamer`)
//!
//! # Example
//!
//! ```no_run
//! use memc_load::{LoaderConfig, MemcacheConnector, PipelineDriver};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LoaderConfig::new().with_pattern("/data/appsinstalled/*.tsv.gz");
//!     let connector = Arc::new(MemcacheConnector::new(config.backend.clone()));
//!
//!     let summary = PipelineDriver::new(config, connector)?.run().await?;
//!     println!("Loaded {} files", summary.files.len());
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod outcome;
pub mod parser;
pub mod processor;
pub mod renamer;
pub mod selftest;
pub mod writer;

// Re-export commonly used types
pub use backend::{BackendConnector, BackendError, CacheBackend, MemcacheConnector};
pub use cli::Cli;
pub use config::{BackendConfig, LoaderConfig};
pub use driver::{FileReport, PipelineDriver, RunSummary};
pub use error::{FileError, LoadError, Result};
pub use outcome::{FileOutcome, LoadVerdict};
pub use processor::FileProcessor;
pub use writer::{BackendWriter, WriteOutcome};
