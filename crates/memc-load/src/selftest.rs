//! Built-in codec self-test (`--test`)
//!
//! Parses the sample lines, encodes each record the way the writers do,
//! decodes the bytes back and checks that nothing was lost. Touches neither
//! files nor caches.

use memc_common::{MemcError, UserApps};
use thiserror::Error;
use tracing::{error, info};

use crate::parser::{parse_line, ParseError};

pub const SAMPLE_LINES: [&str; 2] = [
    "idfa\t1rfw452y52g2gq4g\t55.55\t42.42\t1423,43,567,3,7,23",
    "gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424",
];

#[derive(Debug, Error)]
pub enum SelfTestError {
    #[error("Sample line {line} was rejected: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error("Sample line {line} cannot be decoded: {source}")]
    Decode {
        line: usize,
        #[source]
        source: MemcError,
    },

    #[error("Sample line {line}: {field} does not round-trip")]
    Mismatch { line: usize, field: &'static str },
}

/// Check every sample line; returns how many passed
pub fn run() -> Result<usize, SelfTestError> {
    for (idx, sample) in SAMPLE_LINES.iter().enumerate() {
        let line = idx + 1;
        if let Err(e) = check_line(line, sample) {
            error!(line, error = %e, "Self-test failed");
            return Err(e);
        }
    }

    info!(lines = SAMPLE_LINES.len(), "Test for equality successfully passed");
    Ok(SAMPLE_LINES.len())
}

fn check_line(line: usize, sample: &str) -> Result<(), SelfTestError> {
    let record = parse_line(sample).map_err(|source| SelfTestError::Parse { line, source })?;

    let decoded = UserApps::decode_value(&record.encode_value())
        .map_err(|source| SelfTestError::Decode { line, source })?;

    let mismatch = |field| SelfTestError::Mismatch { line, field };
    if decoded.apps != record.apps() {
        return Err(mismatch("apps"));
    }
    if decoded.lat != Some(record.lat()) {
        return Err(mismatch("lat"));
    }
    if decoded.lon != Some(record.lon()) {
        return Err(mismatch("lon"));
    }
    if decoded != record.to_user_apps() {
        return Err(mismatch("message"));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_round_trip() {
        assert_eq!(run().unwrap(), 2);
    }

    #[test]
    fn test_rejected_sample_reports_line() {
        let err = check_line(3, "idfa\t\t55.55\t42.42\t1").unwrap_err();
        assert!(matches!(err, SelfTestError::Parse { line: 3, .. }));
    }
}
