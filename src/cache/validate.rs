//! Year-consistency checks for cached session lists
//!
//! Session-list keys end in the season they were fetched for
//! (`f1PracticeSessions_2025`). A payload whose records belong to another
//! season was stored under the wrong key and must not be served.

use serde_json::Value;

/// Extracts the four-digit year suffix of a cache key
pub fn key_year(key: &str) -> Option<i32> {
    let suffix = key.rsplit('_').next()?;
    if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Extracts the season of a payload from its first record
///
/// Prefers an explicit `year` field, then the leading year of `date_start`
/// or `date`. Accepts either an array of records or a single record.
pub fn payload_year(data: &Value) -> Option<i32> {
    let record = match data {
        Value::Array(items) => items.first()?,
        Value::Object(_) => data,
        _ => return None,
    };

    if let Some(year) = record.get("year").and_then(Value::as_i64) {
        return i32::try_from(year).ok();
    }

    ["date_start", "date"].iter().find_map(|field| {
        record
            .get(*field)
            .and_then(Value::as_str)
            .and_then(|date| date.get(..4))
            .and_then(|prefix| prefix.parse().ok())
    })
}

/// Whether the payload's season agrees with the year encoded in `key`
///
/// Keys without a year suffix and payloads without date metadata pass.
pub fn year_matches(key: &str, data: &Value) -> bool {
    match (key_year(key), payload_year(data)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}
