//! Per-file load summary and the error-rate verdict

use memc_common::{DeviceMap, DeviceType};
use serde::Serialize;
use std::path::Path;
use tracing::{error, info};

use crate::writer::WriteOutcome;

/// Whether a file's error rate is within tolerance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadVerdict {
    Acceptable,
    HighErrorRate,
}

impl LoadVerdict {
    /// Judge `errors` out of `processed` against `threshold`
    ///
    /// A rate equal to the threshold is still acceptable. Nothing processed
    /// is acceptable by convention.
    pub fn judge(processed: u64, errors: u64, threshold: f64) -> LoadVerdict {
        match error_rate(processed, errors) {
            Some(rate) if rate > threshold => LoadVerdict::HighErrorRate,
            _ => LoadVerdict::Acceptable,
        }
    }

    pub fn is_acceptable(self) -> bool {
        self == LoadVerdict::Acceptable
    }
}

fn error_rate(processed: u64, errors: u64) -> Option<f64> {
    (processed > 0).then(|| errors as f64 / processed as f64)
}

/// Everything counted while loading one file
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileOutcome {
    /// Non-blank lines read
    pub lines: u64,
    /// Lines rejected by the parser
    pub parse_errors: u64,
    /// Parsed records whose device type has no configured address
    pub unrouted: u64,
    /// Writer summaries; devices without a writer stay at zero
    pub writes: DeviceMap<WriteOutcome>,
}

impl FileOutcome {
    /// Records handed to writers
    pub fn processed(&self) -> u64 {
        self.writes.iter().map(|(_, w)| w.processed).sum()
    }

    pub fn write_failures(&self) -> u64 {
        self.writes.iter().map(|(_, w)| w.failures).sum()
    }

    /// Parse errors, unrouted records and failed writes together
    pub fn errors(&self) -> u64 {
        self.parse_errors + self.unrouted + self.write_failures()
    }

    /// `errors / processed`, or `None` when nothing was processed
    pub fn error_rate(&self) -> Option<f64> {
        error_rate(self.processed(), self.errors())
    }

    pub fn verdict(&self, threshold: f64) -> LoadVerdict {
        LoadVerdict::judge(self.processed(), self.errors(), threshold)
    }

    pub(crate) fn record_write(&mut self, device: DeviceType, outcome: WriteOutcome) {
        let slot = self.writes.get_mut(device);
        *slot = slot.merge(outcome);
    }

    /// Log the verdict for `path` and return it
    pub fn log_verdict(&self, path: &Path, threshold: f64) -> LoadVerdict {
        let verdict = self.verdict(threshold);
        let rate = self.error_rate().unwrap_or(0.0);

        match verdict {
            LoadVerdict::Acceptable => info!(
                file = %path.display(),
                processed = self.processed(),
                errors = self.errors(),
                error_rate = rate,
                "Acceptable error rate. Successful load"
            ),
            LoadVerdict::HighErrorRate => error!(
                file = %path.display(),
                processed = self.processed(),
                errors = self.errors(),
                error_rate = rate,
                threshold,
                "High error rate. Failed load"
            ),
        }

        verdict
    }
}
