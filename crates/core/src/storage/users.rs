//! User storage operations

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::User;

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create or rename a user
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn upsert(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, display_name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
            params![
                user.id.to_string(),
                user.display_name,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, display_name, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(User {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        display_name: row.get(1)?,
                        created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    })
                },
            )
            .optional()?;

        Ok(user)
    }
}
