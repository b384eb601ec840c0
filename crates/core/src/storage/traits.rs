//! Storage repository traits
//!
//! These traits define the storage interface the scheduler runs against,
//! allowing for different implementations (SQLite, mock, future network
//! backend).

use uuid::Uuid;

use crate::error::Result;
use crate::models::{AvailabilityEntry, Room, User};

/// User repository operations
pub trait UserRepository {
    /// Create a user, or update the display name of an existing one
    fn upsert_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

/// Room aggregate repository operations
pub trait RoomRepository {
    /// Insert a new room
    fn create_room(&self, room: &Room) -> Result<()>;

    /// Find room by ID
    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>>;

    /// Find room by its (normalized) invite code
    fn find_room_by_invite_code(&self, code: &str) -> Result<Option<Room>>;

    /// Whether any room already uses this invite code
    fn invite_code_exists(&self, code: &str) -> Result<bool>;

    /// Save the room if the stored version still equals `expected`
    fn save_room_if_version(&self, room: &Room, expected: u64) -> Result<bool>;

    /// Delete a room
    fn delete_room(&self, room_id: Uuid) -> Result<bool>;

    /// List rooms the user owns or belongs to
    fn list_rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>>;

    /// Locate the room holding a request
    fn find_room_id_by_request(&self, request_id: Uuid) -> Result<Option<Uuid>>;
}

/// Read access to the external recurring-availability store
pub trait AvailabilityRepository {
    /// A user's recurring availability entries
    fn availability_for_user(&self, user_id: Uuid) -> Result<Vec<AvailabilityEntry>>;

    /// Replace a user's entries
    fn replace_availability(&self, user_id: Uuid, entries: &[AvailabilityEntry]) -> Result<()>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or network.
pub trait Storage: UserRepository + RoomRepository + AvailabilityRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: UserRepository + RoomRepository + AvailabilityRepository {}
