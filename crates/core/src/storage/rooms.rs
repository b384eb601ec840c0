//! Room aggregate storage
//!
//! Each room is one JSON document. The `version` column is authoritative and
//! every save is conditional on it, so two writers working from the same
//! snapshot cannot both succeed.

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_document, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Room;

const SELECT_ROOM: &str = "SELECT document, version FROM rooms";

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<Room> {
    let mut room: Room = parse_document(&row.get::<_, String>(0)?)?;
    room.version = row.get::<_, i64>(1)? as u64;
    Ok(room)
}

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a new room at its current version
    #[instrument(skip(self, room), fields(room_id = %room.id, invite_code = %room.invite_code))]
    pub fn insert(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "INSERT INTO rooms (id, name, invite_code, owner_id, version, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                room.id.to_string(),
                room.name,
                room.invite_code,
                room.owner_id.to_string(),
                room.version as i64,
                serde_json::to_string(room)?,
                room.created_at.to_rfc3339(),
                room.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let room = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_ROOM),
                params![id.to_string()],
                room_from_row,
            )
            .optional()?;
        Ok(room)
    }

    #[instrument(skip(self))]
    pub fn find_by_invite_code(&self, code: &str) -> Result<Option<Room>> {
        let room = self
            .conn
            .query_row(
                &format!("{} WHERE invite_code = ?1", SELECT_ROOM),
                params![code],
                room_from_row,
            )
            .optional()?;
        Ok(room)
    }

    pub fn invite_code_exists(&self, code: &str) -> Result<bool> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM rooms WHERE invite_code = ?1)",
            params![code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Replace the stored document if it is still at `expected`.
    /// Returns false when another writer got there first.
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn save_if_version(&self, room: &Room, expected: u64) -> Result<bool> {
        let mut stored = room.clone();
        stored.version = expected + 1;

        let updated = self.conn.execute(
            "UPDATE rooms
             SET name = ?1, invite_code = ?2, owner_id = ?3, version = ?4, document = ?5, updated_at = ?6
             WHERE id = ?7 AND version = ?8",
            params![
                stored.name,
                stored.invite_code,
                stored.owner_id.to_string(),
                stored.version as i64,
                serde_json::to_string(&stored)?,
                stored.updated_at.to_rfc3339(),
                stored.id.to_string(),
                expected as i64,
            ],
        )?;
        Ok(updated == 1)
    }

    /// Returns whether a room was deleted
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM rooms WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    /// Rooms the user owns or belongs to, oldest first
    #[instrument(skip(self))]
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Room>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1
                OR EXISTS (
                    SELECT 1 FROM json_each(rooms.document, '$.members') AS m
                    WHERE json_extract(m.value, '$.user_id') = ?1
                )
             ORDER BY created_at",
            SELECT_ROOM
        ))?;

        let rooms = stmt
            .query_map(params![user_id.to_string()], room_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rooms)
    }

    /// The room whose negotiation log holds `request_id`
    #[instrument(skip(self))]
    pub fn find_room_id_by_request(&self, request_id: Uuid) -> Result<Option<Uuid>> {
        let id = self
            .conn
            .query_row(
                "SELECT rooms.id FROM rooms, json_each(rooms.document, '$.requests') AS r
                 WHERE json_extract(r.value, '$.id') = ?1
                 LIMIT 1",
                params![request_id.to_string()],
                |row| parse_uuid(&row.get::<_, String>(0)?),
            )
            .optional()?;
        Ok(id)
    }
}
