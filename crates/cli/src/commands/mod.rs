//! Subcommand implementations

pub mod availability;
pub mod request;
pub mod resolve;
pub mod room;
pub mod slot;
pub mod user;
