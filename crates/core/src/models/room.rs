//! Room model - the aggregate root of the scheduling engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Member, Request, RoomRole, TimeSlot};
use crate::error::{Error, Result};
use crate::interval::{DayKey, TimeRange};
use crate::permissions::{PermissionMatrix, RoomAction};

/// A named interval the room keeps free
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedInterval {
    pub name: String,
    pub range: TimeRange,
}

/// An owner-synced one-off exception (holiday, event) on a specific day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomException {
    pub title: String,
    pub day: DayKey,
    pub range: TimeRange,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoomSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<TimeRange>,
    #[serde(default)]
    pub blocked: Vec<BlockedInterval>,
    #[serde(default)]
    pub exceptions: Vec<RoomException>,
}

/// A Room groups one owner, its members, and their shared slot ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub invite_code: String,
    /// Capacity for non-owner members
    pub max_members: u32,
    #[serde(default)]
    pub settings: RoomSettings,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default)]
    pub requests: Vec<Request>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, owned by storage
    #[serde(default)]
    pub version: u64,
}

impl Room {
    pub fn new(
        name: String,
        owner_id: Uuid,
        invite_code: String,
        max_members: u32,
        owner_color: String,
    ) -> Result<Self> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("Room name must not be empty".into()));
        }
        if max_members == 0 {
            return Err(Error::Validation("A room needs room for at least one member".into()));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            owner_id,
            invite_code,
            max_members,
            settings: RoomSettings::default(),
            members: vec![Member::new(owner_id, RoomRole::Owner, owner_color)],
            time_slots: Vec::new(),
            requests: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn with_description(mut self, description: String) -> Self {
        let description = description.trim().to_string();
        self.description = (!description.is_empty()).then_some(description);
        self
    }

    pub fn with_settings(mut self, settings: RoomSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// The user's role, if they take part in this room at all
    pub fn role_of(&self, user_id: Uuid) -> Option<RoomRole> {
        if self.is_owner(user_id) {
            return Some(RoomRole::Owner);
        }
        self.members
            .iter()
            .any(|m| m.user_id == user_id)
            .then_some(RoomRole::Member)
    }

    /// Owner or member
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.role_of(user_id).is_some()
    }

    pub fn member(&self, user_id: Uuid) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// Number of non-owner members, the figure capacity is checked against
    pub fn member_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.user_id != self.owner_id)
            .count()
    }

    /// Check that `user_id` may perform `action`, returning their role
    pub fn require(&self, user_id: Uuid, action: RoomAction) -> Result<RoomRole> {
        let role = self.role_of(user_id).ok_or_else(|| {
            Error::PermissionDenied(format!("User {} is not part of room {}", user_id, self.id))
        })?;

        if !PermissionMatrix::can_perform(role, action) {
            return Err(Error::PermissionDenied(format!(
                "{} cannot {}",
                role,
                action.describe()
            )));
        }

        Ok(role)
    }

    pub fn slots_of(&self, user_id: Uuid) -> impl Iterator<Item = &TimeSlot> {
        self.time_slots.iter().filter(move |s| s.user_id == user_id)
    }

    pub fn request(&self, request_id: Uuid) -> Option<&Request> {
        self.requests.iter().find(|r| r.id == request_id)
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
