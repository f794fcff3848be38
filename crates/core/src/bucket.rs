//! Time buckets for collapsing repeated history entries
//!
//! Two instants share a bucket when they truncate to the same start of
//! the configured unit. Weeks start on Sunday, quarters on Jan/Apr/Jul/Oct.

use chrono::{DateTime, Datelike, Days, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Granularity of the history log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Minute,
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Start of a bucket, in the wall-clock of the instant it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    year: i32,
    slot: u32,
    hour: u32,
    minute: u32,
}

impl Frequency {
    pub const ALL: [Frequency; 7] = [
        Frequency::Minute,
        Frequency::Hour,
        Frequency::Day,
        Frequency::Week,
        Frequency::Month,
        Frequency::Quarter,
        Frequency::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Minute => "minute",
            Frequency::Hour => "hour",
            Frequency::Day => "day",
            Frequency::Week => "week",
            Frequency::Month => "month",
            Frequency::Quarter => "quarter",
            Frequency::Year => "year",
        }
    }

    /// Truncate an instant to the start of its bucket
    pub fn bucket_key(&self, instant: &DateTime<FixedOffset>) -> BucketKey {
        let local = instant.naive_local();
        let date = local.date();
        let key = |year, slot, hour, minute| BucketKey {
            year,
            slot,
            hour,
            minute,
        };

        match self {
            Frequency::Minute => key(date.year(), date.ordinal(), local.hour(), local.minute()),
            Frequency::Hour => key(date.year(), date.ordinal(), local.hour(), 0),
            Frequency::Day => key(date.year(), date.ordinal(), 0, 0),
            Frequency::Week => {
                let back = Days::new(u64::from(date.weekday().num_days_from_sunday()));
                let start = date.checked_sub_days(back).unwrap_or(date);
                key(start.year(), start.ordinal(), 0, 0)
            }
            Frequency::Month => key(date.year(), date.month(), 0, 0),
            Frequency::Quarter => key(date.year(), date.month0() / 3, 0, 0),
            Frequency::Year => key(date.year(), 0, 0, 0),
        }
    }

    /// Whether `other` falls in the same bucket as `instant`
    ///
    /// `other` is viewed in `instant`'s offset first, so a history entry
    /// written in another timezone is compared on the current wall clock.
    pub fn same_bucket(&self, instant: &DateTime<FixedOffset>, other: &DateTime<FixedOffset>) -> bool {
        let other = other.with_timezone(instant.offset());
        self.bucket_key(instant) == self.bucket_key(&other)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = s.trim().to_ascii_lowercase();
        let unit = unit.strip_suffix('s').unwrap_or(unit.as_str());
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == unit)
            .ok_or_else(|| format!("unknown frequency '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(text).unwrap()
    }

    #[test]
    fn test_day_buckets() {
        let day = Frequency::Day;
        assert!(day.same_bucket(&at("2024-01-01T15:00:00Z"), &at("2024-01-01T10:00:00Z")));
        assert!(!day.same_bucket(&at("2024-01-02T09:00:00Z"), &at("2024-01-01T10:00:00Z")));
    }

    #[test]
    fn test_week_starts_on_sunday() {
        let week = Frequency::Week;
        // 2024-01-06 is a Saturday, 2024-01-07 a Sunday
        assert!(week.same_bucket(&at("2024-01-06T23:00:00Z"), &at("2023-12-31T01:00:00Z")));
        assert!(!week.same_bucket(&at("2024-01-07T00:00:00Z"), &at("2024-01-06T23:59:00Z")));
    }

    #[test]
    fn test_quarter_and_year() {
        let quarter = Frequency::Quarter;
        assert!(quarter.same_bucket(&at("2024-03-31T12:00:00Z"), &at("2024-01-01T00:00:00Z")));
        assert!(!quarter.same_bucket(&at("2024-04-01T00:00:00Z"), &at("2024-03-31T23:59:00Z")));
        assert!(Frequency::Year.same_bucket(&at("2024-12-31T00:00:00Z"), &at("2024-01-01T00:00:00Z")));
        assert!(!Frequency::Year.same_bucket(&at("2025-01-01T00:00:00Z"), &at("2024-12-31T23:00:00Z")));
    }

    #[test]
    fn test_minute_and_hour() {
        assert!(Frequency::Minute.same_bucket(&at("2024-01-01T10:05:59Z"), &at("2024-01-01T10:05:00Z")));
        assert!(!Frequency::Minute.same_bucket(&at("2024-01-01T10:06:00Z"), &at("2024-01-01T10:05:59Z")));
        assert!(Frequency::Hour.same_bucket(&at("2024-01-01T10:59:00Z"), &at("2024-01-01T10:00:00Z")));
    }

    #[test]
    fn test_other_offset_is_compared_on_local_wall_clock() {
        // 23:30 UTC on the 1st is 00:30 on the 2nd at +01:00
        let now = at("2024-01-02T09:00:00+01:00");
        let previous = at("2024-01-01T23:30:00Z");
        assert!(Frequency::Day.same_bucket(&now, &previous));
    }

    #[test]
    fn test_parse_frequency() {
        assert_eq!("day".parse::<Frequency>().unwrap(), Frequency::Day);
        assert_eq!("Weeks".parse::<Frequency>().unwrap(), Frequency::Week);
        assert!("fortnight".parse::<Frequency>().is_err());
    }
}
