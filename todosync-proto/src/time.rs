//! Timestamp conversion between the wire's ISO-8601 strings and epoch
//! milliseconds.
//!
//! Parsing never fails loudly: anything that cannot be understood becomes
//! `None`. Outgoing timestamps use the server's expected
//! `yyyy-MM-ddTHH:mm:ss` form (no fractional seconds, no offset), in UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Format the server expects for outgoing deadlines.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parses an ISO-8601 timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00Z`, `2024-03-01T10:00:00.5+08:00`)
/// and the naive `2024-03-01T10:00:00[.fff]` form, which is read as UTC.
/// Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Parses an optional timestamp, treating `None` like a parse failure.
#[must_use]
pub fn parse_optional(raw: Option<&str>) -> Option<i64> {
    raw.and_then(parse_timestamp)
}

/// Formats epoch milliseconds in [`WIRE_FORMAT`].
///
/// Returns `None` if `millis` is outside chrono's representable range.
#[must_use]
pub fn format_timestamp(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.format(WIRE_FORMAT).to_string())
}

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
