//! Loads one gzip-compressed file into the caches
//!
//! # Pipeline
//! ```text
//!                       ┌─> [queue] ─> BackendWriter(idfa) ─> memcached
//! file ─> gzip ─> lines ├─> [queue] ─> BackendWriter(gaid) ─> memcached
//!   (blocking scanner)  ├─> [queue] ─> BackendWriter(adid) ─> memcached
//!                       └─> [queue] ─> BackendWriter(dvid) ─> memcached
//! ```
//!
//! The scanner runs on the blocking pool and hands records to per-device
//! writers over bounded queues, so a slow cache throttles reading instead of
//! growing memory. Writers only exist for device types with an address and
//! live for this one file.

use flate2::read::MultiGzDecoder;
use memc_common::{DeviceMap, DeviceType, Record};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::BackendConnector;
use crate::config::LoaderConfig;
use crate::error::FileError;
use crate::outcome::FileOutcome;
use crate::parser::{self, ParseError};
use crate::writer::{BackendWriter, WriteOutcome};

/// Scanner progress is logged every this many non-blank lines
pub const SCAN_PROGRESS_INTERVAL: u64 = 500_000;

type Input = BufReader<MultiGzDecoder<File>>;

/// Line-level counts gathered by the scanner
#[derive(Debug, Default)]
struct ScanReport {
    lines: u64,
    parse_errors: u64,
    unrouted: u64,
    /// Set when reading stopped on a corrupt or truncated stream
    read_error: Option<io::Error>,
    /// Set when a writer queue closed before the scan finished
    closed_writer: Option<DeviceType>,
}

pub struct FileProcessor {
    endpoints: DeviceMap<Option<String>>,
    connector: Arc<dyn BackendConnector>,
    dry_run: bool,
    queue_capacity: usize,
    error_threshold: f64,
}

impl FileProcessor {
    pub fn new(config: &LoaderConfig, connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            endpoints: config.endpoints.clone(),
            connector,
            dry_run: config.dry_run,
            queue_capacity: config.queue_capacity,
            error_threshold: config.error_threshold,
        }
    }

    pub fn error_threshold(&self) -> f64 {
        self.error_threshold
    }

    /// Load every line of `path`
    ///
    /// Bad lines and failed writes are counted in the returned outcome. Only
    /// a file that cannot be opened or decompressed, or a pipeline task that
    /// dies, produces an error.
    pub async fn process(&self, path: &Path) -> Result<FileOutcome, FileError> {
        info!(file = %path.display(), "Processing");

        let input = open_input(path).await?;

        let mut writers: Vec<(DeviceType, JoinHandle<WriteOutcome>)> = Vec::new();
        let queues = self.endpoints.clone().map(|device, address| {
            let backend = self.connector.connect(device, &address?);
            let (tx, task) =
                BackendWriter::new(device, backend, self.dry_run).spawn(self.queue_capacity);
            writers.push((device, task));
            Some(tx)
        });

        // The scanner owns the only senders; writers finish once it returns
        let scan_path = path.to_path_buf();
        let scanned = tokio::task::spawn_blocking(move || scan(input, &queues, &scan_path)).await;

        let mut outcome = FileOutcome::default();
        let mut writer_failure = None;
        for (device, task) in writers {
            match task.await {
                Ok(written) => outcome.record_write(device, written),
                Err(e) => {
                    error!(file = %path.display(), device = %device, error = %e, "Writer task failed");
                    writer_failure.get_or_insert(FileError::Writer {
                        path: path.to_path_buf(),
                        device,
                        reason: e.to_string(),
                    });
                },
            }
        }

        let report = scanned.map_err(|e| FileError::Scanner {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Some(source) = report.read_error {
            return Err(FileError::Decompress {
                path: path.to_path_buf(),
                source,
            });
        }
        if let Some(e) = writer_failure {
            return Err(e);
        }
        if let Some(device) = report.closed_writer {
            return Err(FileError::Writer {
                path: path.to_path_buf(),
                device,
                reason: "queue closed before the file was fully read".to_string(),
            });
        }

        outcome.lines = report.lines;
        outcome.parse_errors = report.parse_errors;
        outcome.unrouted = report.unrouted;

        outcome.log_verdict(path, self.error_threshold);
        Ok(outcome)
    }
}

/// Open `path` and check that it starts with a readable gzip stream
async fn open_input(path: &Path) -> Result<Input, FileError> {
    let path = path.to_path_buf();
    let task_path = path.clone();

    tokio::task::spawn_blocking(move || {
        let file = File::open(&task_path).map_err(|source| FileError::Open {
            path: task_path.clone(),
            source,
        })?;

        let mut input = BufReader::new(MultiGzDecoder::new(file));
        // Decodes the header, so a file that is not gzip fails here rather
        // than after the writers have started
        input.fill_buf().map_err(|source| FileError::Decompress {
            path: task_path.clone(),
            source,
        })?;

        Ok(input)
    })
    .await
    .map_err(|e| FileError::Scanner {
        path,
        reason: e.to_string(),
    })?
}

/// Read, parse and route every line; runs on the blocking pool
fn scan(
    mut input: Input,
    queues: &DeviceMap<Option<mpsc::Sender<Record>>>,
    path: &Path,
) -> ScanReport {
    let mut report = ScanReport::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {},
            Err(e) => {
                error!(file = %path.display(), line = report.lines, error = %e, "Cannot read the file");
                report.read_error = Some(e);
                break;
            },
        }

        let parsed = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => parser::parse_line(line),
            Err(_) => Err(ParseError::InvalidEncoding),
        };

        report.lines += 1;
        if report.lines % SCAN_PROGRESS_INTERVAL == 0 {
            info!(file = %path.display(), lines = report.lines, "Scan progress");
        }

        let record = match parsed {
            Ok(record) => record,
            Err(ParseError::UnknownDeviceType(device)) => {
                error!(file = %path.display(), device_type = %device, "Unknown device type");
                report.parse_errors += 1;
                continue;
            },
            Err(e) => {
                debug!(file = %path.display(), line = report.lines, error = %e, "Skipping line");
                report.parse_errors += 1;
                continue;
            },
        };

        let device = record.device_type();
        let Some(queue) = queues.get(device) else {
            warn!(file = %path.display(), device = %device, "No cache address for device type");
            report.unrouted += 1;
            continue;
        };

        // Blocks while the writer is behind
        if queue.blocking_send(record).is_err() {
            report.closed_writer = Some(device);
            break;
        }
    }

    report
}
