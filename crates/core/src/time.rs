//! Lenient timestamp parsing and canonical formatting.
//!
//! Incoming timestamps arrive as strings in whatever textual form the client
//! produced. They are normalized to a naive [`Timestamp`] before being
//! compared with the stored value so that an unchanged instant written in a
//! different format is never treated as a change.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::Timestamp;

/// Canonical output format: ISO-8601 without offset, fractional seconds only
/// when non-zero.
const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Offset-carrying formats. The offset is dropped, not applied.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y%m%dT%H%M%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// Parse a timestamp string into a timezone-naive [`Timestamp`].
///
/// Any UTC offset in the input is discarded and the wall-clock time kept, so
/// `2024-03-01T10:00:00+02:00` parses to `2024-03-01T10:00:00`. Date-only
/// input resolves to midnight. Returns `None` when no known format matches.
pub fn parse_timestamp(input: &str) -> Option<Timestamp> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    None
}

/// Render a timestamp in the canonical serialized form.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(CANONICAL_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
