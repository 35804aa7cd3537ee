//! Time utilities for gscd
//!
//! Quota windows follow the local calendar, so every timestamp handled by the
//! daemon is a `DateTime<Local>`.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `GSC_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for watching day and week rollovers without waiting for them.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-28 23:58:00`)
//!
//! Example:
//! ```bash
//! GSC_MOCK_TIME="2025-12-28 23:58:00" ./target/debug/gscd
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::sync::OnceLock;
use std::time::Duration;

use crate::{GscError, Result};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "GSC_MOCK_TIME";

/// Format accepted by `GSC_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Parse a mock time string in the local timezone.
pub fn parse_mock_time(value: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value, MOCK_TIME_FORMAT).map_err(|e| {
        GscError::InvalidMockTime {
            value: value.to_string(),
            message: e.to_string(),
        }
    })?;

    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| GscError::InvalidMockTime {
            value: value.to_string(),
            message: "not a unique local time".into(),
        })
}

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match parse_mock_time(&mock_time_str) {
                    Ok(mock_dt) => {
                        let offset = mock_dt.signed_duration_since(Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            expected_format = MOCK_TIME_FORMAT,
                            "Ignoring mock time"
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

/// Get the current local time, respecting mock time settings in debug builds.
///
/// In release builds, this always returns the real system time.
/// In debug builds, if `GSC_MOCK_TIME` is set, this returns a time
/// that advances from the mock time at the same rate as real time.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// The zero timestamp: a counter that was never updated carries this as its
/// previous run.
pub fn epoch() -> DateTime<Local> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)
}

/// Raw tick count (nanoseconds since the UNIX epoch) used for persistence.
///
/// Instants outside the representable range (years 1677-2262) saturate.
pub fn to_epoch_nanos(dt: &DateTime<Local>) -> i64 {
    dt.timestamp_nanos_opt()
        .unwrap_or(if dt.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

/// Inverse of [`to_epoch_nanos`].
pub fn from_epoch_nanos(nanos: i64) -> DateTime<Local> {
    DateTime::<Utc>::from_timestamp_nanos(nanos).with_timezone(&Local)
}

/// Format a DateTime with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
