//! Time slot model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interval::{overlaps, DayInterval, DayKey, TimeRange};

/// Ledger status of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Confirmed,
    Assigned,
    /// Overlaps at least one other slot on the same day
    Conflict,
}

/// How a slot entered the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOrigin {
    /// Declared by its own user
    Submitted,
    /// Created by an approved time request
    Requested,
    /// Force-assigned by the owner
    OwnerAssigned,
    /// Approved by the auto-assign resolver
    AutoAssigned,
    /// Emitted by a smart exchange relocation
    Exchanged,
}

impl SlotOrigin {
    /// Status a slot returns to once it no longer collides
    pub fn resting_status(self) -> SlotStatus {
        match self {
            SlotOrigin::OwnerAssigned | SlotOrigin::Exchanged => SlotStatus::Assigned,
            SlotOrigin::Submitted | SlotOrigin::Requested | SlotOrigin::AutoAssigned => {
                SlotStatus::Confirmed
            }
        }
    }

    /// Whether smart exchange may relocate slots of this origin
    pub fn is_movable(self) -> bool {
        matches!(
            self,
            SlotOrigin::OwnerAssigned | SlotOrigin::AutoAssigned | SlotOrigin::Exchanged
        )
    }
}

/// A proposed interval, as carried by submissions and requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub day: DayKey,
    pub range: TimeRange,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub priority: u8,
}

impl SlotSpec {
    pub fn new(day: DayKey, range: TimeRange) -> Self {
        Self {
            day,
            range,
            subject: String::new(),
            priority: 0,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn interval(&self) -> DayInterval {
        DayInterval::new(self.day, self.range)
    }
}

/// One (user, day, range) entry in a room's ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day: DayKey,
    pub range: TimeRange,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub priority: u8,
    pub status: SlotStatus,
    pub origin: SlotOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl TimeSlot {
    pub fn from_spec(user_id: Uuid, spec: &SlotSpec, origin: SlotOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            day: spec.day,
            range: spec.range,
            subject: spec.subject.clone(),
            priority: spec.priority,
            status: origin.resting_status(),
            origin,
            assigned_by: None,
            assigned_at: None,
        }
    }

    pub fn assigned(mut self, by: Uuid, at: DateTime<Utc>) -> Self {
        self.assigned_by = Some(by);
        self.assigned_at = Some(at);
        self
    }

    pub fn interval(&self) -> DayInterval {
        DayInterval::new(self.day, self.range)
    }

    pub fn collides_with(&self, other: &TimeSlot) -> bool {
        overlaps(&self.interval(), &other.interval())
    }

    /// Exact (user, day, start, end) identity
    pub fn matches(&self, user_id: Uuid, day: &DayKey, range: &TimeRange) -> bool {
        self.user_id == user_id && self.day == *day && self.range == *range
    }

    pub fn matches_spec(&self, user_id: Uuid, spec: &SlotSpec) -> bool {
        self.matches(user_id, &spec.day, &spec.range)
    }

    pub fn duration_minutes(&self) -> u16 {
        self.range.duration_minutes()
    }
}
