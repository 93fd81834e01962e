//! Error types shared across MemcLoad crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, MemcError>;

/// Main error type for shared domain logic
#[derive(Error, Debug)]
pub enum MemcError {
    #[error("Failed to decode cache value: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
