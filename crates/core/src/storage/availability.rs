//! Recurring availability storage
//!
//! The engine only reads these entries; writing is offered for seeding and
//! for the command-line driver.

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_date_opt, parse_range};
use crate::error::Result;
use crate::models::AvailabilityEntry;

pub struct AvailabilityStore<'a> {
    conn: &'a Connection,
}

impl<'a> AvailabilityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Replace every entry of a user
    #[instrument(skip(self, entries), fields(count = entries.len()))]
    pub fn replace_for_user(&self, user_id: Uuid, entries: &[AvailabilityEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM availability WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO availability (user_id, day_of_week, start_time, end_time, priority, specific_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    user_id.to_string(),
                    entry.day_of_week,
                    entry.range.start().to_string(),
                    entry.range.end().to_string(),
                    entry.priority,
                    entry.specific_date.map(|d| d.to_string()),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AvailabilityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT day_of_week, start_time, end_time, priority, specific_date
             FROM availability WHERE user_id = ?1
             ORDER BY day_of_week, start_time",
        )?;

        let entries = stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok(AvailabilityEntry {
                    day_of_week: row.get(0)?,
                    range: parse_range(&row.get::<_, String>(1)?, &row.get::<_, String>(2)?)?,
                    priority: row.get(3)?,
                    specific_date: parse_date_opt(row.get(4)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}
