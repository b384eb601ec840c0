//! SQLite storage layer for roomgrid

mod availability;
mod migrations;
mod parse;
mod rooms;
mod traits;
mod users;

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::models::{AvailabilityEntry, Room, User};

pub use availability::AvailabilityStore;
pub use rooms::RoomStore;
pub use traits::{AvailabilityRepository, RoomRepository, Storage, UserRepository};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path with default tuning
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, &StorageConfig::default())
    }

    /// Open or create database at the given path
    #[instrument(skip(path, config), fields(path = %path.as_ref().display()))]
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: &StorageConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    pub fn availability(&self) -> AvailabilityStore<'_> {
        AvailabilityStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn upsert_user(&self, user: &User) -> Result<()> {
        self.users().upsert(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }
}

impl RoomRepository for Database {
    fn create_room(&self, room: &Room) -> Result<()> {
        self.rooms().insert(room)
    }

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        self.rooms().find_by_id(id)
    }

    fn find_room_by_invite_code(&self, code: &str) -> Result<Option<Room>> {
        self.rooms().find_by_invite_code(code)
    }

    fn invite_code_exists(&self, code: &str) -> Result<bool> {
        self.rooms().invite_code_exists(code)
    }

    fn save_room_if_version(&self, room: &Room, expected: u64) -> Result<bool> {
        self.rooms().save_if_version(room, expected)
    }

    fn delete_room(&self, room_id: Uuid) -> Result<bool> {
        self.rooms().delete(room_id)
    }

    fn list_rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>> {
        self.rooms().list_for_user(user_id)
    }

    fn find_room_id_by_request(&self, request_id: Uuid) -> Result<Option<Uuid>> {
        self.rooms().find_room_id_by_request(request_id)
    }
}

impl AvailabilityRepository for Database {
    fn availability_for_user(&self, user_id: Uuid) -> Result<Vec<AvailabilityEntry>> {
        self.availability().list_for_user(user_id)
    }

    fn replace_availability(&self, user_id: Uuid, entries: &[AvailabilityEntry]) -> Result<()> {
        self.availability().replace_for_user(user_id, entries)
    }
}
