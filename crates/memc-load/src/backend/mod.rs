//! Cache backend interface
//!
//! The loader only ever needs one operation from a cache: store a value under
//! a key. [`CacheBackend`] is that operation for a single endpoint, and
//! [`BackendConnector`] hands out a fresh handle per (file, device type) so
//! every writer owns its connection exclusively.

mod memcache;

pub use memcache::{MemcacheClient, MemcacheConnector, MAX_KEY_LENGTH};

use async_trait::async_trait;
use memc_common::DeviceType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Cannot connect to {address} after {attempts} attempts: {source}")]
    Connect {
        address: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Timed out waiting for {address}")]
    Timeout { address: String },

    #[error("IO error talking to {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("{address} rejected the write: {reply}")]
    Rejected { address: String, reply: String },
}

/// One key-value endpoint
///
/// No transactions or batching: each `put` either stores the value or fails.
#[async_trait]
pub trait CacheBackend: Send {
    /// Address of the endpoint, for logging
    fn address(&self) -> &str;

    async fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BackendError>;
}

/// Factory for backend handles
///
/// `connect` must not block or touch the network; implementations connect
/// lazily on the first `put`, so dry runs never open a socket.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, device: DeviceType, address: &str) -> Box<dyn CacheBackend>;
}
