//! Shared timestamp helpers for event envelopes.

use chrono::{NaiveDateTime, Utc};

/// Returns the current time as an ISO-8601 datetime without a timezone suffix
/// (implicitly UTC), matching the event file's `timestamp` field (§6.2).
pub fn now_iso() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// Parses a timestamp previously produced by [`now_iso`].
pub fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}
