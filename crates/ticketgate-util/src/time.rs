//! Time utilities for ticketgate
//!
//! Provides the wall clock used as "now" by the command layer, parsing of
//! tracker timestamps, and compact duration labels.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `TICKETGATE_MOCK_TIME` environment variable can be set
//! to override the system time. The value is interpreted as UTC.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2024-01-10 12:00:00`)
//!
//! Example:
//! ```bash
//! TICKETGATE_MOCK_TIME="2024-01-10 12:00:00" ticketgate statistics BP-1.json
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "TICKETGATE_MOCK_TIME";

/// Format accepted by `TICKETGATE_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SECONDS_PER_MINUTE: i64 = 60;
pub const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: i64 = 7 * SECONDS_PER_DAY;

/// Timestamp layout used by the tracker REST API (`2024-01-02T10:00:00.000+0000`)
const TRACKER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Cached mock time offset from the real time when the process started.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(naive_dt) => {
                        let offset = naive_dt.and_utc().signed_duration_since(Utc::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current time, respecting mock time settings in debug builds.
pub fn now() -> DateTime<Utc> {
    let real_now = Utc::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Parse a timestamp as delivered by the tracker.
///
/// Accepts RFC 3339 (`2024-01-02T10:00:00Z`) and the tracker's own layout
/// with a colon-less offset (`2024-01-02T10:00:00.000+0000`).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::<FixedOffset>::parse_from_str(value, TRACKER_TIMESTAMP_FORMAT))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Render elapsed seconds as a compact label such as `1w 2d 3h 4m`.
///
/// Weeks are 7 days and days are 24 hours. Components are decomposed
/// greedily, zero components are omitted and the sub-minute remainder is
/// dropped. Zero or negative input renders as `0m`.
pub fn format_duration(seconds: i64) -> String {
    let mut remaining = seconds.max(0);

    let mut parts = Vec::with_capacity(4);
    for (unit, suffix) in [
        (SECONDS_PER_WEEK, 'w'),
        (SECONDS_PER_DAY, 'd'),
        (SECONDS_PER_HOUR, 'h'),
        (SECONDS_PER_MINUTE, 'm'),
    ] {
        let count = remaining / unit;
        remaining %= unit;
        if count > 0 {
            parts.push(format!("{}{}", count, suffix));
        }
    }

    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}
