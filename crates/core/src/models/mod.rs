//! Data models for roomgrid

mod availability;
mod membership;
mod request;
mod room;
mod slot;
mod user;

pub use availability::*;
pub use membership::*;
pub use request::*;
pub use room::*;
pub use slot::*;
pub use user::*;
