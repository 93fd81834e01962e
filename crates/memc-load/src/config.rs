//! Loader configuration
//!
//! Everything a run needs: which files to pick up, where each device type's
//! cache lives, how wide the worker pool is, and how the memcached client
//! behaves. Built from the command line in `main`, validated once before any
//! worker starts.

use memc_common::{DeviceMap, DeviceType};
use serde::Serialize;
use std::time::Duration;

use crate::error::{LoadError, Result};

// ============================================================================
// Loader Configuration Constants
// ============================================================================

/// Default glob pattern for input files.
pub const DEFAULT_PATTERN: &str = "./data/*.tsv.gz";

/// Default number of concurrent file workers.
pub const DEFAULT_WORKERS: usize = 20;

/// Default tolerated ratio of errors to processed records per file.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.01;

/// Default capacity of each per-device writer queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default memcached connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default timeout for one set request/response round trip.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of reconnect attempts after a failed connect.
pub const DEFAULT_CONNECT_RETRIES: u32 = 5;

/// Default memcached address for a device type.
pub fn default_address(device: DeviceType) -> &'static str {
    match device {
        DeviceType::Idfa => "127.0.0.1:33013",
        DeviceType::Gaid => "127.0.0.1:33014",
        DeviceType::Adid => "127.0.0.1:33015",
        DeviceType::Dvid => "127.0.0.1:33016",
    }
}

/// Memcached client settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendConfig {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub connect_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            connect_retries: DEFAULT_CONNECT_RETRIES,
        }
    }
}

/// Configuration for one loader run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderConfig {
    /// Shell-style glob selecting the input files
    pub pattern: String,

    /// Cache address per device type; `None` disables that device type
    pub endpoints: DeviceMap<Option<String>>,

    /// Number of files processed concurrently
    pub workers: usize,

    /// Log intended writes instead of sending them
    pub dry_run: bool,

    /// Highest error rate at which a file still counts as a successful load
    pub error_threshold: f64,

    /// Records buffered per device writer before the scanner blocks
    pub queue_capacity: usize,

    /// Stop handing out new files after the first file-level failure
    pub fail_fast: bool,

    pub backend: BackendConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            endpoints: DeviceMap::from_fn(|device| Some(default_address(device).to_string())),
            workers: DEFAULT_WORKERS,
            dry_run: false,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fail_fast: false,
            backend: BackendConfig::default(),
        }
    }
}

impl LoaderConfig {
    /// Create new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// Set or clear the address for one device type
    ///
    /// Blank addresses are treated as "not configured".
    pub fn with_endpoint(mut self, device: DeviceType, address: Option<String>) -> Self {
        *self.endpoints.get_mut(device) = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_error_threshold(mut self, threshold: f64) -> Self {
        self.error_threshold = threshold;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Device types that have an address
    pub fn configured_devices(&self) -> impl Iterator<Item = DeviceType> + '_ {
        self.endpoints
            .iter()
            .filter(|(_, address)| address.is_some())
            .map(|(device, _)| device)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pattern.trim().is_empty() {
            return Err(LoadError::Config("file pattern must not be empty".to_string()));
        }

        if self.workers == 0 {
            return Err(LoadError::Config("workers must be at least 1".to_string()));
        }

        if self.queue_capacity == 0 {
            return Err(LoadError::Config("queue capacity must be at least 1".to_string()));
        }

        if !(0.0..=1.0).contains(&self.error_threshold) {
            return Err(LoadError::Config(format!(
                "error threshold must be within [0, 1], got {}",
                self.error_threshold
            )));
        }

        if self.configured_devices().next().is_none() {
            return Err(LoadError::Config(
                "at least one device type needs a cache address".to_string(),
            ));
        }

        if self.backend.connect_timeout.is_zero() || self.backend.io_timeout.is_zero() {
            return Err(LoadError::Config("backend timeouts must be non-zero".to_string()));
        }

        Ok(())
    }
}
