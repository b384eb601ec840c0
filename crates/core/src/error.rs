//! Error types for roomgrid core

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Room is full ({max} members)")]
    Capacity { max: u32 },

    #[error("The owner cannot be removed from their own room")]
    SelfRemoval,

    #[error("Nothing to do: {0}")]
    NoWork(String),

    #[error("No movable assignment: {0}")]
    NoAssignment(String),

    #[error("{0}")]
    NotPreferred(String),

    #[error("{0}")]
    NoOverlap(String),

    #[error("Requested time is outside the shared availability; available windows: {windows}")]
    OutOfWindow { windows: String },

    #[error("Room was modified concurrently; gave up after {attempts} attempts")]
    WriteConflict { attempts: u32 },
}

impl Error {
    /// A UNIQUE or CHECK constraint rejected the write
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
