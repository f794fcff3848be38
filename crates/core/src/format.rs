//! Moment-style date patterns
//!
//! Patterns use the moment.js token set (`YYYY-MM-DD`, `X`, `Do MMMM`, ...)
//! since that is what existing vault settings carry. Text inside square
//! brackets is literal, as is any character that is not a token.
//!
//! Parsing is strict: every token must match and the whole input must be
//! consumed. A numeric stamp is parsed through its decimal text, so a
//! pattern like `X` round-trips through an integer field.

use crate::value::Stamp;
use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike,
};
use serde_json::Value;
use std::fmt::Write;

/// Pattern used when none is configured (ISO 8601 with offset)
pub const DEFAULT_PATTERN: &str = "YYYY-MM-DDTHH:mm:ssZ";

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Year4,
    Year2,
    Quarter,
    Month,
    Month2,
    MonthShort,
    MonthLong,
    Day,
    Day2,
    DayOrdinal,
    DayOfYear,
    DayOfYear3,
    Weekday,
    WeekdayMin,
    WeekdayShort,
    WeekdayLong,
    IsoWeekday,
    LocaleWeekday,
    Week,
    Week2,
    IsoWeek,
    IsoWeek2,
    Hour,
    Hour2,
    Hour12,
    Hour12Pad,
    HourFrom1,
    HourFrom1Pad,
    Minute,
    Minute2,
    Second,
    Second2,
    Fraction(u32),
    MeridiemUpper,
    MeridiemLower,
    Offset,
    OffsetCompact,
    UnixSeconds,
    UnixMillis,
}

impl Token {
    fn fixed_width(self) -> Option<usize> {
        match self {
            Token::Year4 => Some(4),
            Token::DayOfYear3 => Some(3),
            Token::Year2
            | Token::Month2
            | Token::Day2
            | Token::Week2
            | Token::IsoWeek2
            | Token::Hour2
            | Token::Hour12Pad
            | Token::HourFrom1Pad
            | Token::Minute2
            | Token::Second2 => Some(2),
            Token::Quarter | Token::Weekday | Token::IsoWeekday | Token::LocaleWeekday => Some(1),
            Token::Fraction(digits) => Some(digits as usize),
            _ => None,
        }
    }
}

// Longer spellings of the same letter come first so the first hit wins.
const TOKENS: &[(&str, Token)] = &[
    ("YYYY", Token::Year4),
    ("YY", Token::Year2),
    ("Q", Token::Quarter),
    ("MMMM", Token::MonthLong),
    ("MMM", Token::MonthShort),
    ("MM", Token::Month2),
    ("M", Token::Month),
    ("Do", Token::DayOrdinal),
    ("DDDD", Token::DayOfYear3),
    ("DDD", Token::DayOfYear),
    ("DD", Token::Day2),
    ("D", Token::Day),
    ("dddd", Token::WeekdayLong),
    ("ddd", Token::WeekdayShort),
    ("dd", Token::WeekdayMin),
    ("d", Token::Weekday),
    ("E", Token::IsoWeekday),
    ("e", Token::LocaleWeekday),
    ("ww", Token::Week2),
    ("w", Token::Week),
    ("WW", Token::IsoWeek2),
    ("W", Token::IsoWeek),
    ("HH", Token::Hour2),
    ("H", Token::Hour),
    ("hh", Token::Hour12Pad),
    ("h", Token::Hour12),
    ("kk", Token::HourFrom1Pad),
    ("k", Token::HourFrom1),
    ("mm", Token::Minute2),
    ("m", Token::Minute),
    ("ss", Token::Second2),
    ("s", Token::Second),
    ("SSS", Token::Fraction(3)),
    ("SS", Token::Fraction(2)),
    ("S", Token::Fraction(1)),
    ("A", Token::MeridiemUpper),
    ("a", Token::MeridiemLower),
    ("ZZ", Token::OffsetCompact),
    ("Z", Token::Offset),
    ("X", Token::UnixSeconds),
    ("x", Token::UnixMillis),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Token(Token),
    Literal(String),
}

fn compile(pattern: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        if ch == '[' {
            if let Some(end) = rest.find(']') {
                literal.push_str(&rest[1..end]);
                rest = &rest[end + 1..];
                continue;
            }
        }

        if let Some((text, token)) = TOKENS.iter().find(|(text, _)| rest.starts_with(*text)) {
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Token(*token));
            rest = &rest[text.len()..];
            continue;
        }

        literal.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !literal.is_empty() {
        pieces.push(Piece::Literal(literal));
    }
    pieces
}

/// Compiled timestamp pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormatter {
    pattern: String,
    pieces: Vec<Piece>,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self::new("")
    }
}

impl DateFormatter {
    /// Compile a pattern; an empty pattern selects [`DEFAULT_PATTERN`]
    pub fn new(pattern: &str) -> Self {
        let pattern = if pattern.is_empty() {
            DEFAULT_PATTERN
        } else {
            pattern
        };
        Self {
            pattern: pattern.to_string(),
            pieces: compile(pattern),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render to text
    pub fn render(&self, instant: &DateTime<FixedOffset>) -> String {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Token(token) => render_token(*token, instant, &mut out),
            }
        }
        out
    }

    /// Render to a stamp, integer when the output is purely numeric
    pub fn format(&self, instant: &DateTime<FixedOffset>) -> Stamp {
        Stamp::from_rendered(self.render(instant))
    }

    /// Strictly parse text produced by this pattern
    ///
    /// `reference` supplies the offset when the pattern has none, and the
    /// date when the pattern carries no date fields at all.
    pub fn parse_str(
        &self,
        text: &str,
        reference: &DateTime<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        let mut cursor = Cursor { input: text, pos: 0 };
        let mut parsed = Parsed::default();

        for piece in &self.pieces {
            match piece {
                Piece::Literal(literal) => cursor.literal(literal)?,
                Piece::Token(token) => parse_token(*token, &mut cursor, &mut parsed)?,
            }
        }

        if !cursor.rest().is_empty() {
            return None;
        }
        parsed.assemble(reference)
    }

    pub fn parse_stamp(
        &self,
        stamp: &Stamp,
        reference: &DateTime<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        match stamp {
            Stamp::Text(text) => self.parse_str(text, reference),
            Stamp::Integer(number) => {
                let digits = number.to_string();
                self.parse_str(&digits, reference).or_else(|| {
                    // Leading zeros were lost when the stamp became an integer
                    let width = self.fixed_width()?;
                    if digits.len() >= width || *number < 0 {
                        return None;
                    }
                    self.parse_str(&format!("{:0>width$}", digits), reference)
                })
            }
        }
    }

    /// Rendered length when every piece has a fixed width
    fn fixed_width(&self) -> Option<usize> {
        self.pieces.iter().try_fold(0, |total, piece| {
            let width = match piece {
                Piece::Literal(text) => text.chars().count(),
                Piece::Token(token) => token.fixed_width()?,
            };
            Some(total + width)
        })
    }

    /// Parse a stored metadata value; only strings and integers qualify
    pub fn parse_value(
        &self,
        value: &Value,
        reference: &DateTime<FixedOffset>,
    ) -> Option<DateTime<FixedOffset>> {
        let stamp = Stamp::from_value(value)?;
        self.parse_stamp(&stamp, reference)
    }
}

fn render_token(token: Token, dt: &DateTime<FixedOffset>, out: &mut String) {
    let date = dt.date_naive();
    // Writing into a String cannot fail.
    let _ = match token {
        Token::Year4 => write!(out, "{:04}", dt.year()),
        Token::Year2 => write!(out, "{:02}", dt.year().rem_euclid(100)),
        Token::Quarter => write!(out, "{}", dt.month0() / 3 + 1),
        Token::Month => write!(out, "{}", dt.month()),
        Token::Month2 => write!(out, "{:02}", dt.month()),
        Token::MonthShort => write!(out, "{}", &MONTHS[dt.month0() as usize][..3]),
        Token::MonthLong => write!(out, "{}", MONTHS[dt.month0() as usize]),
        Token::Day => write!(out, "{}", dt.day()),
        Token::Day2 => write!(out, "{:02}", dt.day()),
        Token::DayOrdinal => write!(out, "{}{}", dt.day(), ordinal_suffix(dt.day())),
        Token::DayOfYear => write!(out, "{}", dt.ordinal()),
        Token::DayOfYear3 => write!(out, "{:03}", dt.ordinal()),
        Token::Weekday | Token::LocaleWeekday => {
            write!(out, "{}", dt.weekday().num_days_from_sunday())
        }
        Token::WeekdayMin => write!(out, "{}", &weekday_name(dt)[..2]),
        Token::WeekdayShort => write!(out, "{}", &weekday_name(dt)[..3]),
        Token::WeekdayLong => write!(out, "{}", weekday_name(dt)),
        Token::IsoWeekday => write!(out, "{}", dt.weekday().number_from_monday()),
        Token::Week => write!(out, "{}", locale_week(date)),
        Token::Week2 => write!(out, "{:02}", locale_week(date)),
        Token::IsoWeek => write!(out, "{}", dt.iso_week().week()),
        Token::IsoWeek2 => write!(out, "{:02}", dt.iso_week().week()),
        Token::Hour => write!(out, "{}", dt.hour()),
        Token::Hour2 => write!(out, "{:02}", dt.hour()),
        Token::Hour12 => write!(out, "{}", hour12(dt.hour())),
        Token::Hour12Pad => write!(out, "{:02}", hour12(dt.hour())),
        Token::HourFrom1 => write!(out, "{}", hour_from1(dt.hour())),
        Token::HourFrom1Pad => write!(out, "{:02}", hour_from1(dt.hour())),
        Token::Minute => write!(out, "{}", dt.minute()),
        Token::Minute2 => write!(out, "{:02}", dt.minute()),
        Token::Second => write!(out, "{}", dt.second()),
        Token::Second2 => write!(out, "{:02}", dt.second()),
        Token::Fraction(digits) => {
            let millis = dt.timestamp_subsec_millis().min(999);
            let value = millis / 10u32.pow(3 - digits);
            write!(out, "{:0width$}", value, width = digits as usize)
        }
        Token::MeridiemUpper => write!(out, "{}", if dt.hour() < 12 { "AM" } else { "PM" }),
        Token::MeridiemLower => write!(out, "{}", if dt.hour() < 12 { "am" } else { "pm" }),
        Token::Offset => write!(out, "{}", offset_text(dt.offset(), true)),
        Token::OffsetCompact => write!(out, "{}", offset_text(dt.offset(), false)),
        Token::UnixSeconds => write!(out, "{}", dt.timestamp()),
        Token::UnixMillis => write!(out, "{}", dt.timestamp_millis()),
    };
}

fn weekday_name(dt: &DateTime<FixedOffset>) -> &'static str {
    WEEKDAYS[dt.weekday().num_days_from_sunday() as usize]
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 100, day % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    }
}

fn hour12(hour: u32) -> u32 {
    match hour % 12 {
        0 => 12,
        h => h,
    }
}

fn hour_from1(hour: u32) -> u32 {
    if hour == 0 {
        24
    } else {
        hour
    }
}

/// Week of year with Sunday-start weeks, week 1 containing January 1st
fn locale_week(date: NaiveDate) -> u32 {
    fn sunday_of(date: NaiveDate) -> Option<NaiveDate> {
        date.checked_sub_days(Days::new(u64::from(date.weekday().num_days_from_sunday())))
    }

    let week = || -> Option<u32> {
        let sunday = sunday_of(date)?;
        let saturday = sunday.checked_add_days(Days::new(6))?;
        let first_sunday = sunday_of(NaiveDate::from_ymd_opt(saturday.year(), 1, 1)?)?;
        u32::try_from((sunday - first_sunday).num_days() / 7 + 1).ok()
    };
    week().unwrap_or(1)
}

fn offset_text(offset: &FixedOffset, colon: bool) -> String {
    let seconds = offset.local_minus_utc();
    let sign = if seconds < 0 { '-' } else { '+' };
    let total = seconds.abs();
    let (hours, minutes) = (total / 3600, (total % 3600) / 60);
    if colon {
        format!("{}{:02}:{:02}", sign, hours, minutes)
    } else {
        format!("{}{:02}{:02}", sign, hours, minutes)
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Between `min` and `max` ASCII digits
    fn digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let rest = self.rest();
        let count = rest
            .bytes()
            .take(max)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if count < min {
            return None;
        }
        let value = rest[..count].parse().ok()?;
        self.pos += count;
        Some(value)
    }

    /// Optionally signed integer with an optional decimal fraction
    fn signed(&mut self) -> Option<(i64, Option<u32>)> {
        let rest = self.rest();
        let negative = rest.starts_with('-');
        let start = usize::from(negative);
        let count = rest[start..].bytes().take_while(|b| b.is_ascii_digit()).count();
        if count == 0 {
            return None;
        }
        let whole: i64 = rest[start..start + count].parse().ok()?;
        self.pos += start + count;

        let mut fraction = None;
        if self.rest().starts_with('.') {
            self.pos += 1;
            let digits = self.rest().bytes().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            let text = &self.rest()[..digits.min(3)];
            let scale = 10u32.pow(3 - text.len() as u32);
            fraction = Some(text.parse::<u32>().ok()? * scale);
            self.pos += digits;
        }

        Some((if negative { -whole } else { whole }, fraction))
    }

    fn literal(&mut self, text: &str) -> Option<()> {
        if self.rest().starts_with(text) {
            self.pos += text.len();
            Some(())
        } else {
            None
        }
    }

    /// Case-insensitive match against a word list; returns the index
    fn word(&mut self, words: &[&str]) -> Option<usize> {
        let rest = self.rest();
        let (index, word) = words
            .iter()
            .enumerate()
            .filter(|(_, word)| {
                rest.get(..word.len())
                    .is_some_and(|head| head.eq_ignore_ascii_case(word))
            })
            .max_by_key(|(_, word)| word.len())?;
        self.pos += word.len();
        Some(index)
    }
}

#[derive(Debug, Default)]
struct Parsed {
    year: Option<i32>,
    quarter: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
    ordinal: Option<u32>,
    hour: Option<u32>,
    hour12: Option<u32>,
    pm: Option<bool>,
    minute: Option<u32>,
    second: Option<u32>,
    millis: Option<u32>,
    offset: Option<FixedOffset>,
    epoch_millis: Option<i64>,
}

fn in_range(value: u32, low: u32, high: u32) -> Option<u32> {
    (low..=high).contains(&value).then_some(value)
}

fn parse_token(token: Token, cursor: &mut Cursor<'_>, parsed: &mut Parsed) -> Option<()> {
    match token {
        Token::Year4 => parsed.year = Some(cursor.digits(4, 4)? as i32),
        Token::Year2 => {
            let yy = cursor.digits(2, 2)? as i32;
            parsed.year = Some(if yy > 68 { 1900 + yy } else { 2000 + yy });
        }
        Token::Quarter => parsed.quarter = Some(in_range(cursor.digits(1, 1)?, 1, 4)?),
        Token::Month => parsed.month = Some(in_range(cursor.digits(1, 2)?, 1, 12)?),
        Token::Month2 => parsed.month = Some(in_range(cursor.digits(2, 2)?, 1, 12)?),
        Token::MonthShort => {
            let names: Vec<&str> = MONTHS.iter().map(|m| &m[..3]).collect();
            parsed.month = Some(cursor.word(&names)? as u32 + 1);
        }
        Token::MonthLong => parsed.month = Some(cursor.word(&MONTHS)? as u32 + 1),
        Token::Day => parsed.day = Some(in_range(cursor.digits(1, 2)?, 1, 31)?),
        Token::Day2 => parsed.day = Some(in_range(cursor.digits(2, 2)?, 1, 31)?),
        Token::DayOrdinal => {
            let day = in_range(cursor.digits(1, 2)?, 1, 31)?;
            cursor.literal(ordinal_suffix(day))?;
            parsed.day = Some(day);
        }
        Token::DayOfYear => parsed.ordinal = Some(in_range(cursor.digits(1, 3)?, 1, 366)?),
        Token::DayOfYear3 => parsed.ordinal = Some(in_range(cursor.digits(3, 3)?, 1, 366)?),
        // Weekday and week numbers are validated for shape only; the date
        // itself comes from the calendar fields.
        Token::Weekday | Token::LocaleWeekday => {
            in_range(cursor.digits(1, 1)?, 0, 6)?;
        }
        Token::IsoWeekday => {
            in_range(cursor.digits(1, 1)?, 1, 7)?;
        }
        Token::WeekdayMin => {
            let names: Vec<&str> = WEEKDAYS.iter().map(|d| &d[..2]).collect();
            cursor.word(&names)?;
        }
        Token::WeekdayShort => {
            let names: Vec<&str> = WEEKDAYS.iter().map(|d| &d[..3]).collect();
            cursor.word(&names)?;
        }
        Token::WeekdayLong => {
            cursor.word(&WEEKDAYS)?;
        }
        Token::Week | Token::IsoWeek => {
            in_range(cursor.digits(1, 2)?, 1, 53)?;
        }
        Token::Week2 | Token::IsoWeek2 => {
            in_range(cursor.digits(2, 2)?, 1, 53)?;
        }
        Token::Hour => parsed.hour = Some(in_range(cursor.digits(1, 2)?, 0, 23)?),
        Token::Hour2 => parsed.hour = Some(in_range(cursor.digits(2, 2)?, 0, 23)?),
        Token::Hour12 => parsed.hour12 = Some(in_range(cursor.digits(1, 2)?, 1, 12)?),
        Token::Hour12Pad => parsed.hour12 = Some(in_range(cursor.digits(2, 2)?, 1, 12)?),
        Token::HourFrom1 | Token::HourFrom1Pad => {
            let min = if token == Token::HourFrom1Pad { 2 } else { 1 };
            let hour = in_range(cursor.digits(min, 2)?, 1, 24)?;
            parsed.hour = Some(hour % 24);
        }
        Token::Minute => parsed.minute = Some(in_range(cursor.digits(1, 2)?, 0, 59)?),
        Token::Minute2 => parsed.minute = Some(in_range(cursor.digits(2, 2)?, 0, 59)?),
        Token::Second => parsed.second = Some(in_range(cursor.digits(1, 2)?, 0, 59)?),
        Token::Second2 => parsed.second = Some(in_range(cursor.digits(2, 2)?, 0, 59)?),
        Token::Fraction(digits) => {
            let n = digits as usize;
            let value = cursor.digits(n, n)?;
            parsed.millis = Some(value * 10u32.pow(3 - digits));
        }
        Token::MeridiemUpper | Token::MeridiemLower => {
            parsed.pm = Some(cursor.word(&["am", "pm"])? == 1);
        }
        Token::Offset | Token::OffsetCompact => parsed.offset = Some(parse_offset(cursor)?),
        Token::UnixSeconds => {
            let (seconds, fraction) = cursor.signed()?;
            let millis = i64::from(fraction.unwrap_or(0));
            let millis = if seconds < 0 { -millis } else { millis };
            parsed.epoch_millis = Some(seconds.checked_mul(1000)?.checked_add(millis)?);
        }
        Token::UnixMillis => {
            let (millis, fraction) = cursor.signed()?;
            if fraction.is_some() {
                return None;
            }
            parsed.epoch_millis = Some(millis);
        }
    }
    Some(())
}

fn parse_offset(cursor: &mut Cursor<'_>) -> Option<FixedOffset> {
    if cursor.literal("Z").is_some() || cursor.literal("z").is_some() {
        return FixedOffset::east_opt(0);
    }
    let sign = if cursor.literal("+").is_some() {
        1
    } else if cursor.literal("-").is_some() {
        -1
    } else {
        return None;
    };
    let hours = in_range(cursor.digits(2, 2)?, 0, 23)?;
    let _ = cursor.literal(":");
    let minutes = in_range(cursor.digits(2, 2)?, 0, 59)?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60) as i32)
}

impl Parsed {
    fn assemble(self, reference: &DateTime<FixedOffset>) -> Option<DateTime<FixedOffset>> {
        let offset = self.offset.unwrap_or(*reference.offset());

        if let Some(millis) = self.epoch_millis {
            return offset.timestamp_millis_opt(millis).single();
        }

        let has_date = self.year.is_some()
            || self.quarter.is_some()
            || self.month.is_some()
            || self.day.is_some()
            || self.ordinal.is_some();

        let date = if !has_date {
            reference.date_naive()
        } else {
            let year = self.year.unwrap_or_else(|| reference.year());
            match (self.ordinal, self.month, self.day) {
                (Some(ordinal), None, None) => NaiveDate::from_yo_opt(year, ordinal)?,
                (_, month, day) => {
                    let month = month
                        .or(self.quarter.map(|q| (q - 1) * 3 + 1))
                        .unwrap_or(1);
                    NaiveDate::from_ymd_opt(year, month, day.unwrap_or(1))?
                }
            }
        };

        let hour = match (self.hour12, self.hour, self.pm) {
            (Some(h), _, Some(true)) => h % 12 + 12,
            (Some(h), _, Some(false)) => h % 12,
            (Some(h), _, None) => h,
            (None, Some(h), Some(true)) if h < 12 => h + 12,
            (None, Some(h), _) => h,
            (None, None, _) => 0,
        };

        let time = NaiveTime::from_hms_milli_opt(
            hour,
            self.minute.unwrap_or(0),
            self.second.unwrap_or(0),
            self.millis.unwrap_or(0),
        )?;

        offset.from_local_datetime(&date.and_time(time)).single()
    }
}
