//! Timestamp helpers
//!
//! All timestamps in the matching core are Unix nanoseconds (i64).

use chrono::Utc;

/// Current time as Unix nanoseconds
pub fn now_nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}
