//! roomgrid core library
//!
//! A shared weekly time grid: rooms, their members, a conflict-aware slot
//! ledger, negotiation requests, auto-assignment, and smart exchange, with
//! SQLite persistence.

pub mod auto_assign;
pub mod config;
pub mod error;
pub mod exchange;
pub mod interval;
pub mod invariants;
mod ledger;
pub mod models;
mod negotiation;
pub mod permissions;
pub mod registry;
pub mod service;
pub mod storage;

pub use auto_assign::{AutoAssignConflict, AutoAssignReport};
pub use config::{ConfigError, EngineConfig};
pub use error::{Error, Result};
pub use exchange::{ExchangeOutcome, ExchangePreferences};
pub use interval::{ClockTime, DayInterval, DayKey, TimeRange};
pub use models::*;
pub use permissions::*;
pub use registry::{JoinOutcome, RoomUpdate};
pub use service::{NewRoom, Scheduler, SlotView};
pub use storage::{
    AvailabilityRepository, Database, RoomRepository, Storage, UserRepository,
};
