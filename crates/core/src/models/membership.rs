//! Membership and role models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room roles in priority order (lowest to highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    /// Declares slots and negotiates with other members
    Member,
    /// Full control over the room and its ledger
    Owner,
}

impl RoomRole {
    pub fn display_name(&self) -> &'static str {
        match self {
            RoomRole::Member => "Member",
            RoomRole::Owner => "Owner",
        }
    }
}

impl std::fmt::Display for RoomRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A user's membership record inside a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    pub color: String,
    pub joined_at: DateTime<Utc>,
    pub role: RoomRole,
    /// Reporting counters, maintained by external tooling
    #[serde(default)]
    pub assigned_minutes: u32,
    #[serde(default)]
    pub carry_over_minutes: u32,
}

impl Member {
    pub fn new(user_id: Uuid, role: RoomRole, color: String) -> Self {
        Self {
            user_id,
            color,
            joined_at: Utc::now(),
            role,
            assigned_minutes: 0,
            carry_over_minutes: 0,
        }
    }
}
