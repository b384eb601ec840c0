//! Argument parsers shared by the subcommands

use chrono::{NaiveDate, Weekday};
use roomgrid_core::{DayKey, SlotSpec, TimeRange};

/// Parse `DAY HH:MM-HH:MM`, where DAY is a weekday (`Mon`, `monday`) or a
/// date (`2026-10-14`)
pub fn parse_slot(s: &str) -> Result<SlotSpec, String> {
    let (day, range) = s
        .trim()
        .split_once(char::is_whitespace)
        .ok_or_else(|| format!("expected 'DAY HH:MM-HH:MM', got '{}'", s))?;
    Ok(SlotSpec::new(parse_day(day)?, parse_range(range.trim())?))
}

pub fn parse_day(s: &str) -> Result<DayKey, String> {
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Ok(DayKey::on(date));
    }
    s.parse::<Weekday>()
        .map(DayKey::weekly)
        .map_err(|_| format!("'{}' is neither a weekday nor a YYYY-MM-DD date", s))
}

/// Parse `HH:MM-HH:MM`
pub fn parse_range(s: &str) -> Result<TimeRange, String> {
    let (start, end) = s
        .split_once('-')
        .ok_or_else(|| format!("expected 'HH:MM-HH:MM', got '{}'", s))?;
    TimeRange::parse(start.trim(), end.trim()).map_err(|e| e.to_string())
}
