//! Command-line surface

use clap::Parser;
use memc_common::logging::{LogConfig, LogLevel, LogOutput};
use memc_common::DeviceType;
use std::path::PathBuf;

use crate::config::{
    default_address, LoaderConfig, DEFAULT_ERROR_THRESHOLD, DEFAULT_PATTERN,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};

/// MemcLoad - load installed-apps logs into memcached
#[derive(Parser, Debug, Clone)]
#[command(name = "memc-load")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log intended writes instead of sending them to memcached
    #[arg(long, env = "MEMC_LOAD_DRY")]
    pub dry: bool,

    /// Append logs to this file instead of printing them
    #[arg(short, long, env = "MEMC_LOAD_LOG")]
    pub log: Option<PathBuf>,

    /// Glob selecting the input files
    #[arg(long, env = "MEMC_LOAD_PATTERN", default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// memcached address for idfa records (empty disables the device type)
    #[arg(long, env = "MEMC_LOAD_IDFA", default_value = default_address(DeviceType::Idfa))]
    pub idfa: String,

    /// memcached address for gaid records (empty disables the device type)
    #[arg(long, env = "MEMC_LOAD_GAID", default_value = default_address(DeviceType::Gaid))]
    pub gaid: String,

    /// memcached address for adid records (empty disables the device type)
    #[arg(long, env = "MEMC_LOAD_ADID", default_value = default_address(DeviceType::Adid))]
    pub adid: String,

    /// memcached address for dvid records (empty disables the device type)
    #[arg(long, env = "MEMC_LOAD_DVID", default_value = default_address(DeviceType::Dvid))]
    pub dvid: String,

    /// Number of files loaded concurrently
    #[arg(short, long, env = "MEMC_LOAD_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Highest tolerated ratio of errors to processed records per file
    #[arg(long, env = "MEMC_LOAD_ERROR_THRESHOLD", default_value_t = DEFAULT_ERROR_THRESHOLD)]
    pub error_threshold: f64,

    /// Records buffered per device writer before reading pauses
    #[arg(long, env = "MEMC_LOAD_QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Stop taking new files after the first file fails
    #[arg(long, env = "MEMC_LOAD_FAIL_FAST")]
    pub fail_fast: bool,

    /// Run the encoding self-test and exit
    #[arg(short, long)]
    pub test: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn address(&self, device: DeviceType) -> &str {
        match device {
            DeviceType::Idfa => &self.idfa,
            DeviceType::Gaid => &self.gaid,
            DeviceType::Adid => &self.adid,
            DeviceType::Dvid => &self.dvid,
        }
    }

    pub fn to_config(&self) -> LoaderConfig {
        DeviceType::ALL
            .into_iter()
            .fold(LoaderConfig::new(), |config, device| {
                config.with_endpoint(device, Some(self.address(device).to_string()))
            })
            .with_pattern(self.pattern.clone())
            .with_workers(self.workers)
            .with_dry_run(self.dry)
            .with_error_threshold(self.error_threshold)
            .with_queue_capacity(self.queue_capacity)
            .with_fail_fast(self.fail_fast)
    }

    /// Logging setup implied by the flags; `LOG_*` variables may still
    /// override it
    ///
    /// Dry runs log at debug level so the skipped writes are visible.
    pub fn log_config(&self) -> LogConfig {
        let level = if self.dry || self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };

        let builder = LogConfig::builder().level(level);
        match &self.log {
            Some(path) => builder.output(LogOutput::File).log_file(path.clone()),
            None => builder.output(LogOutput::Console),
        }
        .build()
    }
}
