//! ISO-8601 timestamp formatting and parsing.
//!
//! Timestamps are written with microsecond precision and a `Z` suffix. Parsing
//! accepts any RFC 3339 string and, for records written by older hosts, naive
//! `YYYY-MM-DDTHH:MM:SS[.f]` strings which are taken to be UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{OscillationError, Result};

/// Format a UTC timestamp as ISO-8601 with microseconds.
pub fn format_iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an ISO-8601 timestamp.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| OscillationError::InvalidTimestamp(s.to_string()))
}

/// Seconds elapsed from `earlier` to `later`, negative if out of order.
pub fn seconds_between(earlier: &DateTime<Utc>, later: &DateTime<Utc>) -> f64 {
    let delta = *later - *earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}
