//! Per-device cache writer
//!
//! A [`BackendWriter`] lives for exactly one file. It drains a bounded queue
//! of records, stores each one through its backend handle, and once the
//! queue is closed and empty returns a single [`WriteOutcome`].
//!
//! Records for one device type are written in queue order; the queue has a
//! single consumer.

use memc_common::{DeviceType, Record};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::CacheBackend;

/// Writer progress is logged every this many records
pub const WRITER_PROGRESS_INTERVAL: u64 = 10_000;

/// Summary of one writer's work on one file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    /// Records taken off the queue, whether or not the write succeeded
    pub processed: u64,
    /// Subset of `processed` whose write failed
    pub failures: u64,
}

impl WriteOutcome {
    pub fn merge(self, other: WriteOutcome) -> WriteOutcome {
        WriteOutcome {
            processed: self.processed + other.processed,
            failures: self.failures + other.failures,
        }
    }
}

pub struct BackendWriter {
    device: DeviceType,
    backend: Box<dyn CacheBackend>,
    dry_run: bool,
}

impl BackendWriter {
    pub fn new(device: DeviceType, backend: Box<dyn CacheBackend>, dry_run: bool) -> Self {
        Self {
            device,
            backend,
            dry_run,
        }
    }

    /// Start the writer on the runtime
    ///
    /// Returns the sending half of its queue and the task that resolves to
    /// the outcome. The task finishes after every sender has been dropped and
    /// the queue is drained.
    pub fn spawn(self, capacity: usize) -> (mpsc::Sender<Record>, JoinHandle<WriteOutcome>) {
        let (tx, rx) = mpsc::channel(capacity);
        let task = tokio::spawn(self.run(rx));
        (tx, task)
    }

    pub async fn run(mut self, mut queue: mpsc::Receiver<Record>) -> WriteOutcome {
        let mut outcome = WriteOutcome::default();

        while let Some(record) = queue.recv().await {
            outcome.processed += 1;
            if !self.write(&record).await {
                outcome.failures += 1;
            }

            if outcome.processed % WRITER_PROGRESS_INTERVAL == 0 {
                debug!(
                    device = %self.device,
                    address = %self.backend.address(),
                    processed = outcome.processed,
                    "Writer progress"
                );
            }
        }

        debug!(
            device = %self.device,
            processed = outcome.processed,
            failures = outcome.failures,
            "Writer queue drained"
        );

        outcome
    }

    /// Store one record; returns whether it was written
    async fn write(&mut self, record: &Record) -> bool {
        let key = record.key();

        if self.dry_run {
            debug!(
                address = %self.backend.address(),
                key = %key,
                value = %record.to_user_apps().describe(),
                "Dry run, skipping write"
            );
            return true;
        }

        match self.backend.put(&key, &record.encode_value()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(device = %self.device, key = %key, error = %e, "Cannot write to memcached");
                false
            },
        }
    }
}
