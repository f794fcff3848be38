//! Minimum-interval guard
//!
//! Two synced copies of a note can each see the other's write as a fresh
//! edit. Refusing to write within [`MIN_UPDATE_INTERVAL_SECS`] of the last
//! recorded stamp cuts that loop off after one redundant round.

use crate::format::DateFormatter;
use crate::policy::is_truthy;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Writes this close to the previous stamp are skipped; independent of the debounce timeout
pub const MIN_UPDATE_INTERVAL_SECS: i64 = 30;

/// The entry that counts as "last recorded" in a stored value
///
/// In log mode that is index 0 (newest first) or the last index; otherwise
/// the whole value.
pub fn latest_entry(value: &Value, log_mode: bool, newest_first: bool) -> Option<&Value> {
    match value {
        Value::Array(entries) if log_mode => {
            if newest_first {
                entries.first()
            } else {
                entries.last()
            }
        }
        other => Some(other),
    }
}

/// Instant of the last recorded stamp, if there is one that parses strictly
pub fn previous_instant(
    previous: Option<&Value>,
    log_mode: bool,
    newest_first: bool,
    formatter: &DateFormatter,
    now: &DateTime<FixedOffset>,
) -> Option<DateTime<FixedOffset>> {
    let previous = previous.filter(|v| is_truthy(Some(*v)))?;
    let entry = latest_entry(previous, log_mode, newest_first)?;
    formatter.parse_value(entry, now)
}

/// Whole seconds since `previous`; `None` stands for an infinite gap
pub fn seconds_since(
    previous: Option<&DateTime<FixedOffset>>,
    now: &DateTime<FixedOffset>,
) -> Option<i64> {
    previous.map(|previous| now.signed_duration_since(*previous).num_seconds())
}

/// Whether the gap is too small to write
pub fn is_too_soon(gap: Option<i64>) -> bool {
    matches!(gap, Some(seconds) if seconds <= MIN_UPDATE_INTERVAL_SECS)
}
