//! Timestamp parsing for batch rows. Values are read as wall-clock time in
//! whatever offset they were written with; no zone conversion happens.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    // Source `created_at`, e.g. "Tue Mar 05 10:00:00 +0000 2024".
    "%a %b %d %H:%M:%S %z %Y",
];

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub fn parse_wall_clock(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `YYYY-MM-DD HH:MM:SS`, fractional seconds dropped.
pub fn canonical_timestamp(raw: &str) -> Option<String> {
    parse_wall_clock(raw).map(|dt| dt.format(CANONICAL_FORMAT).to_string())
}

/// Year, month and day read from the raw field.
pub fn partition_date(raw: &str) -> Option<(i32, u32, u32)> {
    parse_wall_clock(raw).map(|dt| (dt.year(), dt.month(), dt.day()))
}
