//! History log computation
//!
//! In log mode the tracked field is an ordered list of stamps. A new edit
//! either replaces the most recent entry (same time bucket) or is inserted
//! at the newest end, after which the list is trimmed from the oldest end.

use crate::bucket::Frequency;
use crate::config::Settings;
use crate::format::DateFormatter;
use crate::host::Metadata;
use crate::policy::is_truthy;
use crate::value::FieldValue;
use chrono::{DateTime, FixedOffset};
use serde_json::Value;

/// Log mode is on globally or forced by the document's append field
pub fn is_log_mode(metadata: &Metadata, settings: &Settings) -> bool {
    settings.store_history_log || is_truthy(metadata.get(&settings.append_field))
}

/// Ordering, bucketing and bound of the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPolicy {
    pub newest_first: bool,
    pub max_items: usize,
    pub frequency: Frequency,
}

impl HistoryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            newest_first: settings.history_newest_first,
            max_items: settings.history_max_items,
            frequency: settings.append_maximum_frequency,
        }
    }

    /// Stored value as a list: arrays as-is, a bare scalar wrapped, falsy values empty
    pub fn entries(previous: Option<&Value>) -> Vec<Value> {
        match previous {
            Some(Value::Array(entries)) => entries.clone(),
            Some(value) if is_truthy(Some(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    }

    /// Add `entry` for an edit at `now`
    ///
    /// `latest` is the parsed instant of the most recent entry; when it is
    /// missing (unparseable) the entry is always inserted.
    pub fn record(
        &self,
        mut entries: Vec<Value>,
        entry: Value,
        latest: Option<&DateTime<FixedOffset>>,
        now: &DateTime<FixedOffset>,
    ) -> Vec<Value> {
        if entries.is_empty() {
            entries.push(entry);
            return entries;
        }

        let same_bucket = latest.is_some_and(|latest| self.frequency.same_bucket(now, latest));
        if same_bucket {
            let newest = if self.newest_first { 0 } else { entries.len() - 1 };
            entries[newest] = entry;
        } else if self.newest_first {
            entries.insert(0, entry);
        } else {
            entries.push(entry);
        }

        if self.max_items > 0 && entries.len() > self.max_items {
            if self.newest_first {
                entries.truncate(self.max_items);
            } else {
                let excess = entries.len() - self.max_items;
                entries.drain(..excess);
            }
        }
        entries
    }
}

/// New value for the tracked field
///
/// `latest` must be the instant of the entry [`crate::guard::latest_entry`]
/// selects, so bucketing and the interval guard look at the same stamp.
pub fn compute_new_value(
    previous: Option<&Value>,
    latest: Option<&DateTime<FixedOffset>>,
    now: &DateTime<FixedOffset>,
    settings: &Settings,
    formatter: &DateFormatter,
    log_mode: bool,
) -> FieldValue {
    let stamp = formatter.format(now);
    if !log_mode {
        return FieldValue::Scalar(stamp);
    }

    let policy = HistoryPolicy::from_settings(settings);
    let entries = HistoryPolicy::entries(previous);
    FieldValue::Log(policy.record(entries, stamp.to_value(), latest, now))
}
