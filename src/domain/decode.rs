//! Best-effort decoding of text fields read from persisted or fetched rows.
//!
//! Decoders report whether they succeeded; substituting a default is the
//! caller's decision at the I/O boundary, never inside indicator math.

use chrono::{NaiveDate, NaiveDateTime};

/// Date formats accepted on input, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Output date format for persisted tables.
pub const OUTPUT_DATE_FORMAT: &str = "%Y/%m/%d";

/// Parse a number, ignoring surrounding whitespace and `,` thousands separators.
/// Returns `(0.0, false)` when the field cannot be decoded. `NaN` and infinity
/// tokens are not numbers here.
pub fn decode_number(field: &str) -> (f64, bool) {
    let cleaned: String = field.trim().chars().filter(|&c| c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => (v, true),
        _ => (0.0, false),
    }
}

/// Like [`decode_number`], but an empty field is absent rather than a failure.
pub fn decode_optional_number(field: &str) -> (Option<f64>, bool) {
    if field.trim().is_empty() {
        return (None, true);
    }
    let (v, ok) = decode_number(field);
    (Some(v), ok)
}

/// Parse a calendar date in `YYYY/MM/DD` or `YYYY-MM-DD`, optionally followed
/// by a time of day which is discarded.
pub fn decode_date(field: &str) -> Option<NaiveDate> {
    let field = field.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(field, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(OUTPUT_DATE_FORMAT).to_string()
}
