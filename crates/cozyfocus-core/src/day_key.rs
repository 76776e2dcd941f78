//! Local calendar-day keys (`YYYY-MM-DD`).
//!
//! Day keys partition every day-scoped collection. They are computed from
//! local wall-clock fields, never UTC, so "today" matches what the user sees.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::error::ValidationError;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Day key for an epoch-ms timestamp in the local time zone.
pub fn day_key(ts_ms: i64) -> String {
    day_key_in(ts_ms, &Local)
}

/// Day key for an epoch-ms timestamp in an explicit time zone.
///
/// Timestamps outside chrono's range fall back to the epoch day.
pub fn day_key_in<Tz: TimeZone>(ts_ms: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let dt = tz
        .timestamp_millis_opt(ts_ms)
        .earliest()
        .unwrap_or_else(|| DateTime::UNIX_EPOCH.with_timezone(tz));
    dt.format(DAY_KEY_FORMAT).to_string()
}

/// Validate a user-supplied day key.
pub fn parse_day_key(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s, DAY_KEY_FORMAT)
        .ok()
        .filter(|d| d.format(DAY_KEY_FORMAT).to_string() == s)
        .ok_or_else(|| ValidationError::InvalidDayKey(s.to_string()))
}
