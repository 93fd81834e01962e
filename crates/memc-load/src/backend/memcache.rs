//! Memcached text-protocol client
//!
//! Speaks just enough of the protocol to store values:
//!
//! ```text
//! set <key> 0 0 <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! and expects `STORED\r\n` back. One client owns at most one TCP connection.
//! The connection is opened on the first `put` and dropped after any failure,
//! so the next `put` starts from a clean stream.

use async_trait::async_trait;
use memc_common::DeviceType;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{BackendConnector, BackendError, CacheBackend};
use crate::config::BackendConfig;

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

const STORED: &str = "STORED";

/// Opens [`MemcacheClient`] handles with shared settings
#[derive(Debug, Clone, Default)]
pub struct MemcacheConnector {
    config: BackendConfig,
}

impl MemcacheConnector {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

impl BackendConnector for MemcacheConnector {
    fn connect(&self, device: DeviceType, address: &str) -> Box<dyn CacheBackend> {
        debug!(device = %device, address = %address, "Opening memcached handle");
        Box::new(MemcacheClient::new(address, self.config.clone()))
    }
}

pub struct MemcacheClient {
    address: String,
    config: BackendConfig,
    conn: Option<BufStream<TcpStream>>,
}

impl MemcacheClient {
    pub fn new(address: impl Into<String>, config: BackendConfig) -> Self {
        Self {
            address: address.into(),
            config,
            conn: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn open(&self) -> Result<BufStream<TcpStream>, BackendError> {
        let attempts = self.config.connect_retries.saturating_add(1);
        let mut last_error = io::Error::new(io::ErrorKind::NotConnected, "no connection attempt made");

        for attempt in 1..=attempts {
            match timeout(self.config.connect_timeout, TcpStream::connect(&self.address)).await {
                Ok(Ok(stream)) => {
                    // Small request/response pairs; don't wait on Nagle
                    let _ = stream.set_nodelay(true);
                    return Ok(BufStream::new(stream));
                },
                Ok(Err(e)) => {
                    warn!(address = %self.address, attempt, attempts, error = %e, "Connection failed");
                    last_error = e;
                },
                Err(_) => {
                    warn!(address = %self.address, attempt, attempts, "Connection timed out");
                    last_error = io::Error::new(io::ErrorKind::TimedOut, "connect timed out");
                },
            }
        }

        Err(BackendError::Connect {
            address: self.address.clone(),
            attempts,
            source: last_error,
        })
    }
}

#[async_trait]
impl CacheBackend for MemcacheClient {
    fn address(&self) -> &str {
        &self.address
    }

    async fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        validate_key(key)?;

        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.open().await?,
        };

        let reply = match timeout(self.config.io_timeout, store(&mut conn, key, value)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(source)) => {
                return Err(BackendError::Io {
                    address: self.address.clone(),
                    source,
                })
            },
            Err(_) => {
                return Err(BackendError::Timeout {
                    address: self.address.clone(),
                })
            },
        };

        if reply != STORED {
            return Err(BackendError::Rejected {
                address: self.address.clone(),
                reply,
            });
        }

        self.conn = Some(conn);
        Ok(())
    }
}

/// Send one `set` and read the single-line reply
async fn store(conn: &mut BufStream<TcpStream>, key: &str, value: &[u8]) -> io::Result<String> {
    let header = format!("set {} 0 0 {}\r\n", key, value.len());
    conn.write_all(header.as_bytes()).await?;
    conn.write_all(value).await?;
    conn.write_all(b"\r\n").await?;
    conn.flush().await?;

    let mut reply = String::new();
    if conn.read_line(&mut reply).await? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before reply",
        ));
    }

    Ok(reply.trim_end().to_string())
}

fn validate_key(key: &str) -> Result<(), BackendError> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.len() > MAX_KEY_LENGTH {
        "key is longer than 250 bytes"
    } else if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        "key contains whitespace or control characters"
    } else {
        return Ok(());
    };

    Err(BackendError::InvalidKey {
        key: key.to_string(),
        reason,
    })
}
