//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::interval::TimeRange;

fn conversion<E>(column: usize, e: E) -> SqlError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SqlError::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s).map_err(|e| conversion(0, e))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion(0, e))
}

/// Parse an optional `YYYY-MM-DD` date
pub fn parse_date_opt(s: Option<String>) -> Result<Option<NaiveDate>, SqlError> {
    s.map(|s| s.parse::<NaiveDate>().map_err(|e| conversion(0, e)))
        .transpose()
}

/// Parse a stored `HH:MM` pair into a range
pub fn parse_range(start: &str, end: &str) -> Result<TimeRange, SqlError> {
    TimeRange::parse(start, end).map_err(|e| conversion(0, e))
}

/// Deserialize a JSON document column
pub fn parse_document<T: DeserializeOwned>(s: &str) -> Result<T, SqlError> {
    serde_json::from_str(s).map_err(|e| conversion(0, e))
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
