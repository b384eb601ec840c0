//! Recurring availability entries from the external preference store

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::interval::{DayKey, TimeRange};

/// One window of a user's weekly availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u8,
    pub range: TimeRange,
    #[serde(default)]
    pub priority: u8,
    /// Applies only on this date, replacing the weekly pattern for it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_date: Option<NaiveDate>,
}

impl AvailabilityEntry {
    pub fn weekly(weekday: Weekday, range: TimeRange) -> Self {
        Self {
            day_of_week: weekday_number(weekday),
            range,
            priority: 0,
            specific_date: None,
        }
    }

    pub fn on_date(date: NaiveDate, range: TimeRange) -> Self {
        Self {
            day_of_week: weekday_number(date.weekday()),
            range,
            priority: 0,
            specific_date: Some(date),
        }
    }
}

/// Sunday-based weekday number used by the preference store
pub fn weekday_number(weekday: Weekday) -> u8 {
    weekday.num_days_from_sunday() as u8
}

/// Windows that apply on `day`. Date-specific entries for that date win over
/// the weekly pattern.
pub fn windows_for(entries: &[AvailabilityEntry], day: &DayKey) -> Vec<TimeRange> {
    if let Some(date) = day.date {
        let dated: Vec<TimeRange> = entries
            .iter()
            .filter(|e| e.specific_date == Some(date))
            .map(|e| e.range)
            .collect();
        if !dated.is_empty() {
            return dated;
        }
    }

    let number = weekday_number(day.weekday);
    entries
        .iter()
        .filter(|e| e.specific_date.is_none() && e.day_of_week == number)
        .map(|e| e.range)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekly_entries_match_weekday() {
        let entries = vec![
            AvailabilityEntry::weekly(Weekday::Wed, TimeRange::parse("13:00", "17:00").unwrap()),
            AvailabilityEntry::weekly(Weekday::Thu, TimeRange::parse("09:00", "10:00").unwrap()),
        ];
        let windows = windows_for(&entries, &DayKey::weekly(Weekday::Wed));
        assert_eq!(windows, vec![TimeRange::parse("13:00", "17:00").unwrap()]);
        assert_eq!(entries[0].day_of_week, 3);
    }

    #[test]
    fn test_specific_date_overrides_weekly() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        let entries = vec![
            AvailabilityEntry::weekly(Weekday::Wed, TimeRange::parse("13:00", "17:00").unwrap()),
            AvailabilityEntry::on_date(date, TimeRange::parse("08:00", "09:00").unwrap()),
        ];
        assert_eq!(
            windows_for(&entries, &DayKey::on(date)),
            vec![TimeRange::parse("08:00", "09:00").unwrap()]
        );
        let next_week = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
        assert_eq!(
            windows_for(&entries, &DayKey::on(next_week)),
            vec![TimeRange::parse("13:00", "17:00").unwrap()]
        );
    }
}
