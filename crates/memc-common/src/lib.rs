//! MemcLoad Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the MemcLoad workspace.
//!
//! # Overview
//!
//! - **Types**: device types, parsed installation records, the cache value message
//! - **Error Handling**: custom error type and result alias
//! - **Logging**: one-shot `tracing` subscriber setup for binaries
//!
//! # Example
//!
//! ```no_run
//! use memc_common::types::{DeviceType, Record};
//!
//! let record = Record::new(DeviceType::Idfa, "abc123", 67.7, 38.9, vec![7942, 8519])
//!     .expect("valid record");
//! assert_eq!(record.key(), "idfa:abc123");
//! let packed = record.encode_value();
//! assert!(!packed.is_empty());
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{MemcError, Result};
pub use types::{DeviceMap, DeviceType, Record, UserApps};
