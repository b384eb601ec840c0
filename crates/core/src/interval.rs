//! Interval algebra over minute-granularity clock times
//!
//! Slots, availability windows, and exchange destinations are all half-open
//! `[start, end)` ranges on a single day. Everything here is pure.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Time of day with minute precision, written as `HH:MM` (`24:00` allowed as an end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime(u16);

impl ClockTime {
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(Error::Validation(format!(
                "{} minutes is past the end of the day",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn hm(hour: u16, minute: u16) -> Result<Self> {
        if minute >= 60 {
            return Err(Error::Validation(format!("Invalid minute {}", minute)));
        }
        let minutes = hour
            .checked_mul(60)
            .and_then(|m| m.checked_add(minute))
            .ok_or_else(|| Error::Validation(format!("Invalid hour {}", hour)))?;
        Self::from_minutes(minutes)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Add minutes; `None` past 24:00
    pub fn plus(self, minutes: u16) -> Option<Self> {
        self.0
            .checked_add(minutes)
            .filter(|m| *m <= MINUTES_PER_DAY)
            .map(Self)
    }
}

impl FromStr for ClockTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("Invalid time '{}', expected HH:MM", s));

        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
        if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
            return Err(invalid());
        }

        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        if hour > 24 || minute >= 60 || (hour == 24 && minute != 0) {
            return Err(invalid());
        }

        Ok(Self(hour * 60 + minute))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

/// Half-open `[start, end)` range with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct TimeRange {
    start: ClockTime,
    end: ClockTime,
}

#[derive(Deserialize)]
struct RawRange {
    start: ClockTime,
    end: ClockTime,
}

impl TryFrom<RawRange> for TimeRange {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        TimeRange::new(raw.start, raw.end)
    }
}

impl TimeRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self> {
        if start >= end {
            return Err(Error::Validation(format!(
                "Start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse from two `HH:MM` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> ClockTime {
        self.start
    }

    pub fn end(&self) -> ClockTime {
        self.end
    }

    pub fn duration_minutes(&self) -> u16 {
        self.end.0 - self.start.0
    }

    /// Half-open overlap; back-to-back ranges do not overlap
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest range covering both
    pub fn cover(&self, other: &TimeRange) -> TimeRange {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Same duration, beginning at `start`; `None` if it would run past 24:00
    pub fn starting_at(&self, start: ClockTime) -> Option<TimeRange> {
        let end = start.plus(self.duration_minutes())?;
        Some(Self { start, end })
    }

    /// Move this range by the distance between `from` and `to`
    pub fn shifted(&self, from: ClockTime, to: ClockTime) -> Option<TimeRange> {
        let offset = i32::from(to.0) - i32::from(from.0);
        let start = i32::from(self.start.0) + offset;
        if start < 0 {
            return None;
        }
        let start = ClockTime::from_minutes(u16::try_from(start).ok()?).ok()?;
        self.starting_at(start)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The day a slot lives on: a weekday, optionally pinned to a calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayKey {
    pub weekday: Weekday,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl DayKey {
    pub fn weekly(weekday: Weekday) -> Self {
        Self {
            weekday,
            date: None,
        }
    }

    pub fn on(date: NaiveDate) -> Self {
        Self {
            weekday: date.weekday(),
            date: Some(date),
        }
    }

    /// Equal dates when both are dated, otherwise equal weekdays
    pub fn same_day(&self, other: &DayKey) -> bool {
        match (self.date, other.date) {
            (Some(a), Some(b)) => a == b,
            _ => self.weekday == other.weekday,
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(f, "{} {}", self.weekday, date),
            None => write!(f, "{}", self.weekday),
        }
    }
}

/// A range on a particular day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayInterval {
    pub day: DayKey,
    pub range: TimeRange,
}

impl DayInterval {
    pub fn new(day: DayKey, range: TimeRange) -> Self {
        Self { day, range }
    }
}

/// True iff both intervals fall on the same day and their ranges intersect
pub fn overlaps(a: &DayInterval, b: &DayInterval) -> bool {
    a.day.same_day(&b.day) && a.range.overlaps(&b.range)
}

/// Minimal ordered cover of one day's ranges. Touching ranges are folded.
pub fn merge_same_day(ranges: &[TimeRange]) -> Vec<TimeRange> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut merged: Vec<TimeRange> = Vec::with_capacity(sorted.len());
    for next in sorted {
        match merged.last_mut() {
            Some(current) if next.start <= current.end => {
                current.end = current.end.max(next.end);
            }
            _ => merged.push(next),
        }
    }
    merged
}

/// Pairwise intersections of two range sets, ordered by start
pub fn intersect(a: &[TimeRange], b: &[TimeRange]) -> Vec<TimeRange> {
    let mut windows: Vec<TimeRange> = a
        .iter()
        .flat_map(|x| {
            b.iter().filter_map(move |y| {
                let start = x.start.max(y.start);
                let end = x.end.min(y.end);
                (start < end).then_some(TimeRange { start, end })
            })
        })
        .collect();
    windows.sort_by_key(|r| (r.start, r.end));
    windows.dedup();
    windows
}

/// Comma-separated `HH:MM-HH:MM` list for error messages
pub fn format_windows(windows: &[TimeRange]) -> String {
    windows
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// The date of `weekday` in the Monday-based week containing `date`
pub fn date_in_week(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    week_start(date) + Duration::days(i64::from(weekday.num_days_from_monday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn on(day: Weekday, start: &str, end: &str) -> DayInterval {
        DayInterval::new(DayKey::weekly(day), r(start, end))
    }

    #[test]
    fn test_clock_time_parse_and_display() {
        let t: ClockTime = "09:05".parse().unwrap();
        assert_eq!(t.minutes(), 9 * 60 + 5);
        assert_eq!(t.to_string(), "09:05");
        assert_eq!("24:00".parse::<ClockTime>().unwrap().minutes(), MINUTES_PER_DAY);
    }

    #[test]
    fn test_clock_time_rejects_malformed() {
        for bad in ["", "9", "9:5", "25:00", "24:01", "10:60", "ab:cd", "+1:00", "10:00:00"] {
            assert!(bad.parse::<ClockTime>().is_err(), "{} should not parse", bad);
        }
    }

    #[test]
    fn test_clock_time_serde_as_string() {
        let t = ClockTime::hm(13, 30).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"13:30\"");
        let back: ClockTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<ClockTime>("\"7pm\"").is_err());
    }

    #[test]
    fn test_range_rejects_empty_and_inverted() {
        assert!(TimeRange::parse("10:00", "10:00").is_err());
        assert!(TimeRange::parse("11:00", "10:00").is_err());
        assert!(serde_json::from_str::<TimeRange>(r#"{"start":"11:00","end":"10:00"}"#).is_err());
    }

    #[test]
    fn test_overlaps_is_symmetric_and_reflexive() {
        let a = on(Weekday::Mon, "10:00", "11:00");
        let b = on(Weekday::Mon, "10:30", "11:30");
        assert!(overlaps(&a, &b));
        assert!(overlaps(&b, &a));
        assert!(overlaps(&a, &a));
    }

    #[test]
    fn test_back_to_back_and_other_day_do_not_overlap() {
        let a = on(Weekday::Mon, "10:00", "11:00");
        assert!(!overlaps(&a, &on(Weekday::Mon, "11:00", "12:00")));
        assert!(!overlaps(&a, &on(Weekday::Tue, "10:00", "11:00")));
    }

    #[test]
    fn test_dated_days_compare_by_date() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let a = DayInterval::new(DayKey::on(monday), r("10:00", "11:00"));
        let b = DayInterval::new(DayKey::on(next_monday), r("10:00", "11:00"));
        let weekly = on(Weekday::Mon, "10:30", "10:45");
        assert!(!overlaps(&a, &b));
        assert!(overlaps(&a, &weekly));
    }

    #[test]
    fn test_merge_folds_touching_and_overlapping() {
        let merged = merge_same_day(&[
            r("13:00", "14:00"),
            r("09:00", "10:00"),
            r("10:00", "11:00"),
            r("13:30", "15:00"),
        ]);
        assert_eq!(merged, vec![r("09:00", "11:00"), r("13:00", "15:00")]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let once = merge_same_day(&[r("08:00", "09:30"), r("09:00", "10:00"), r("12:00", "13:00")]);
        let twice = merge_same_day(&once);
        assert_eq!(once, twice);
        assert!(once.windows(2).all(|w| w[0].end() < w[1].start()));
    }

    #[test]
    fn test_intersect_is_commutative() {
        let a = vec![r("09:00", "12:00"), r("14:00", "18:00")];
        let b = vec![r("11:00", "15:00")];
        let ab = intersect(&a, &b);
        assert_eq!(ab, vec![r("11:00", "12:00"), r("14:00", "15:00")]);
        assert_eq!(ab, intersect(&b, &a));
        assert!(intersect(&a, &[r("12:00", "14:00")]).is_empty());
    }

    #[test]
    fn test_shifted_keeps_duration() {
        let seg = r("10:30", "11:00");
        let moved = seg
            .shifted(ClockTime::hm(10, 0).unwrap(), ClockTime::hm(13, 0).unwrap())
            .unwrap();
        assert_eq!(moved, r("13:30", "14:00"));
        assert!(r("23:00", "23:30")
            .shifted(ClockTime::hm(9, 0).unwrap(), ClockTime::hm(10, 0).unwrap())
            .is_none());
    }

    #[test]
    fn test_week_helpers() {
        let thursday = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(week_start(thursday), NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(
            date_in_week(thursday, Weekday::Sun),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
    }
}
