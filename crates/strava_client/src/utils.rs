//! Utility functions for time window parsing.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a window bound into a UTC instant.
///
/// Accepts:
/// - YYYY-MM-DD -> midnight UTC of that day
/// - RFC3339 datetime -> converted to UTC
/// - Naive datetime YYYY-MM-DDTHH:MM:SS -> interpreted as UTC
pub fn parse_window_bound(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(ndt.and_utc());
    }
    None
}
