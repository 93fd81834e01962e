//! Installed-apps log line parser
//!
//! Parses one line of the decompressed input into a [`Record`].
//!
//! # Line Format
//! Five tab-separated fields:
//!
//! ```text
//! dev_type <TAB> dev_id <TAB> lat <TAB> lon <TAB> app_id,app_id,...
//! idfa     	1rfw452y52g2gq4g	55.55	42.42	1423,43,567,3,7,23
//! ```
//!
//! A line is rejected as a whole when the field count is wrong, an identity
//! field is empty, a coordinate is not a number, or the device type is not
//! one of the known families. Individual app ids that are not integers are
//! dropped with a warning and do not reject the line.

use memc_common::{DeviceType, Record};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected 5 tab-separated fields, got {0}")]
    MalformedLine(usize),

    #[error("Line is not valid UTF-8")]
    InvalidEncoding,

    #[error("Device type or device id is empty")]
    MissingIdentity,

    #[error("Invalid {field} coordinate: {value:?}")]
    BadCoordinate { field: &'static str, value: String },

    #[error("Unknown device type: {0:?}")]
    UnknownDeviceType(String),
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// App ids extracted from the comma-separated apps field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppsField {
    /// Valid ids, in their original order, duplicates kept
    pub apps: Vec<u32>,
    /// Number of tokens that were not non-negative integers
    pub dropped: usize,
}

/// A parsed line together with what was dropped from it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub record: Record,
    /// App id tokens dropped from the apps field
    pub dropped_apps: usize,
}

/// Parse a single line into a [`Record`]
///
/// Surrounding whitespace other than tabs is ignored. Blank lines must be
/// filtered out by the caller; a blank line here is a
/// [`ParseError::MalformedLine`].
pub fn parse_line(line: &str) -> Result<Record> {
    parse_line_detailed(line).map(|parsed| parsed.record)
}

/// Like [`parse_line`], also reporting how many app ids were dropped
pub fn parse_line_detailed(line: &str) -> Result<ParsedLine> {
    let fields: Vec<&str> = trim_line(line).split('\t').collect();
    let &[dev_type, dev_id, lat, lon, raw_apps] = fields.as_slice() else {
        return Err(ParseError::MalformedLine(fields.len()));
    };

    if dev_type.is_empty() || dev_id.is_empty() {
        return Err(ParseError::MissingIdentity);
    }

    let lat = parse_coordinate("lat", lat)?;
    let lon = parse_coordinate("lon", lon)?;

    let device_type: DeviceType = dev_type
        .parse()
        .map_err(|_| ParseError::UnknownDeviceType(dev_type.to_string()))?;

    let AppsField { apps, dropped } = parse_apps(raw_apps);

    let record = Record::new(device_type, dev_id, lat, lon, apps)
        .map_err(|_| ParseError::MissingIdentity)?;
    Ok(ParsedLine {
        record,
        dropped_apps: dropped,
    })
}

/// Parse the comma-separated apps field
///
/// Empty tokens (from `",,"` or a trailing comma) are ignored silently. Any
/// other token that does not parse as a `u32` is dropped and logged.
pub fn parse_apps(raw: &str) -> AppsField {
    let mut field = AppsField::default();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<u32>() {
            Ok(app) => field.apps.push(app),
            Err(_) => {
                warn!(token = %token, "Not all user apps are digits, dropping token");
                field.dropped += 1;
            },
        }
    }

    field
}

/// Strip surrounding whitespace except tabs, which delimit a possibly empty
/// trailing apps field
fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() && c != '\t')
}

/// Out-of-range numbers such as `1e400` are rejected rather than saturated
/// to infinity; only the literal spellings `inf`, `infinity` and `nan`
/// yield a non-finite coordinate.
fn parse_coordinate(field: &'static str, value: &str) -> Result<f64> {
    let token = value.trim();
    let bad = || ParseError::BadCoordinate {
        field,
        value: value.to_string(),
    };

    let parsed = token.parse::<f64>().map_err(|_| bad())?;
    if parsed.is_finite() || is_non_finite_literal(token) {
        Ok(parsed)
    } else {
        Err(bad())
    }
}

fn is_non_finite_literal(token: &str) -> bool {
    let unsigned = token.trim_start_matches(['+', '-']);
    ["inf", "infinity", "nan"]
        .iter()
        .any(|literal| unsigned.eq_ignore_ascii_case(literal))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_reference_line() {
        let line = "idfa\tabc123\t67.7\t38.9\t7942,8519,notanumber,1";

        let ParsedLine {
            record,
            dropped_apps,
        } = parse_line_detailed(line).unwrap();
        assert_eq!(record.device_type(), DeviceType::Idfa);
        assert_eq!(record.device_id(), "abc123");
        assert_eq!(record.lat(), 67.7);
        assert_eq!(record.lon(), 38.9);
        assert_eq!(record.apps(), &[7942, 8519, 1]);
        assert_eq!(dropped_apps, 1);

        assert_eq!(parse_line(line).unwrap(), record);
    }

    #[test]
    fn test_parse_all_device_types() {
        for device in DeviceType::ALL {
            let line = format!("{device}\tid-1\t1.0\t2.0\t3");
            assert_eq!(parse_line(&line).unwrap().device_type(), device);
        }
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let record = parse_line("  gaid\t7rfw452y52g2gq4g\t55.55\t42.42\t7423,424\r\n").unwrap();
        assert_eq!(record.device_id(), "7rfw452y52g2gq4g");
        assert_eq!(record.apps(), &[7423, 424]);
    }

    #[test]
    fn test_wrong_field_count_is_malformed() {
        assert_eq!(
            parse_line("idfa\tabc\t1.0\t2.0").unwrap_err(),
            ParseError::MalformedLine(4)
        );
        assert_eq!(
            parse_line("idfa\tabc\t1.0\t2.0\t1,2\textra").unwrap_err(),
            ParseError::MalformedLine(6)
        );
        assert_eq!(
            parse_line("idfa abc 1.0 2.0 1,2").unwrap_err(),
            ParseError::MalformedLine(1)
        );
    }

    #[test]
    fn test_empty_identity_is_rejected() {
        assert_eq!(
            parse_line("\tabc\t1.0\t2.0\t1").unwrap_err(),
            ParseError::MissingIdentity
        );
        assert_eq!(
            parse_line("idfa\t\t1.0\t2.0\t1").unwrap_err(),
            ParseError::MissingIdentity
        );
    }

    #[test]
    fn test_bad_coordinates_are_rejected() {
        assert!(matches!(
            parse_line("idfa\tabc\tnorth\t2.0\t1").unwrap_err(),
            ParseError::BadCoordinate { field: "lat", .. }
        ));
        assert!(matches!(
            parse_line("idfa\tabc\t1.0\t\t1").unwrap_err(),
            ParseError::BadCoordinate { field: "lon", .. }
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        assert!(matches!(
            parse_line("idfa\tabc\t1e400\t2\t1").unwrap_err(),
            ParseError::BadCoordinate { field: "lat", .. }
        ));
        assert!(matches!(
            parse_line("idfa\tabc\t1\t-1e400\t1").unwrap_err(),
            ParseError::BadCoordinate { field: "lon", .. }
        ));
    }

    #[test]
    fn test_non_finite_literals_are_accepted() {
        let record = parse_line("idfa\tabc\tInf\t-infinity\t1").unwrap();
        assert_eq!(record.lat(), f64::INFINITY);
        assert_eq!(record.lon(), f64::NEG_INFINITY);
        assert!(parse_line("idfa\tabc\tNaN\t0\t1").unwrap().lat().is_nan());
    }

    #[test]
    fn test_unknown_device_type_is_rejected() {
        assert_eq!(
            parse_line("ios\tabc\t1.0\t2.0\t1").unwrap_err(),
            ParseError::UnknownDeviceType("ios".to_string())
        );
    }

    #[test]
    fn test_apps_keep_order_and_duplicates() {
        let apps = parse_apps("5,3,5, 8 ,-1,1.5,,");
        assert_eq!(apps.apps, vec![5, 3, 5, 8]);
        assert_eq!(apps.dropped, 2);
    }

    #[test]
    fn test_empty_apps_field_gives_empty_record_apps() {
        let record = parse_line("dvid\tabc\t0\t0\t").unwrap();
        assert!(record.apps().is_empty());
    }

    #[test]
    fn test_numeric_coordinates_round_trip() {
        for (lat, lon) in [(-90.0, 180.0), (0.000001, -0.5), (55.55, 42.42)] {
            let line = format!("adid\tx\t{lat}\t{lon}\t1");
            let record = parse_line(&line).unwrap();
            assert_eq!(record.lat(), lat);
            assert_eq!(record.lon(), lon);
        }
    }

    /// One apps token: a valid id, or junk that must be dropped
    fn app_token() -> impl Strategy<Value = (Option<u32>, String)> {
        prop_oneof![
            any::<u32>().prop_map(|app| (Some(app), app.to_string())),
            "[a-z][a-z0-9]{0,5}".prop_map(|junk| (None, junk)),
        ]
    }

    fn coordinate() -> impl Strategy<Value = f64> {
        proptest::num::f64::NORMAL | proptest::num::f64::ZERO
    }

    proptest! {
        #[test]
        fn test_parse_line_preserves_fields(
            device in proptest::sample::select(DeviceType::ALL.to_vec()),
            id in "[A-Za-z0-9_-]{1,24}",
            lat in coordinate(),
            lon in coordinate(),
            tokens in proptest::collection::vec(app_token(), 0..12),
        ) {
            let raw_apps: Vec<&str> = tokens.iter().map(|(_, raw)| raw.as_str()).collect();
            let expected: Vec<u32> = tokens.iter().filter_map(|(app, _)| *app).collect();
            let line = format!("{device}\t{id}\t{lat}\t{lon}\t{}", raw_apps.join(","));

            let parsed = parse_line_detailed(&line).unwrap();
            prop_assert_eq!(parsed.record.device_type(), device);
            prop_assert_eq!(parsed.record.device_id(), id.as_str());
            prop_assert_eq!(parsed.record.lat(), lat);
            prop_assert_eq!(parsed.record.lon(), lon);
            prop_assert_eq!(parsed.record.apps(), expected.as_slice());
            prop_assert_eq!(parsed.dropped_apps, tokens.len() - expected.len());
        }
    }
}
