//! Error types for the loader
//!
//! Line-level problems never show up here: they are counted per file and
//! only influence the logged error rate. These types cover what stops a
//! file ([`FileError`]) or the whole run ([`LoadError`]).

use memc_common::DeviceType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for run-level operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Failure that prevents a file from being loaded to completion
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decompress {}: {source}", .path.display())]
    Decompress {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Writer for {device} stopped unexpectedly while loading {}: {reason}", .path.display())]
    Writer {
        path: PathBuf,
        device: DeviceType,
        reason: String,
    },

    #[error("Line scanner stopped unexpectedly while loading {}: {reason}", .path.display())]
    Scanner { path: PathBuf, reason: String },
}

impl FileError {
    pub fn path(&self) -> &PathBuf {
        match self {
            FileError::Open { path, .. }
            | FileError::Decompress { path, .. }
            | FileError::Writer { path, .. }
            | FileError::Scanner { path, .. } => path,
        }
    }
}

/// Failure that ends the run with a non-zero exit status
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid file pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("No files found matching {0:?}")]
    NoFilesFound(String),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("Cannot mark {} as processed: {source}", .path.display())]
    Rename {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
