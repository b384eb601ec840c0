//! Negotiation request model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SlotSpec, TimeSlot};
use crate::interval::{DayKey, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// The decider's answer to a pending request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

/// What a request asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestPayload {
    /// Add a new slot for the requester
    TimeRequest { slot: SlotSpec },
    /// Replace one of the requester's slots with another
    TimeChange { from: SlotSpec, to: SlotSpec },
    /// Give up one of the requester's slots
    SlotRelease { slot: SlotSpec },
    /// Take over a slot held by another member
    SlotSwap { slot: SlotSpec, target_user_id: Uuid },
    /// Escalated smart exchange: both sides' slots as they were when asked
    ExchangeRequest {
        source: Vec<TimeSlot>,
        occupied: Vec<TimeSlot>,
        desired_day: DayKey,
        desired_range: TimeRange,
        target_user_id: Uuid,
    },
}

impl RequestPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            RequestPayload::TimeRequest { .. } => "time_request",
            RequestPayload::TimeChange { .. } => "time_change",
            RequestPayload::SlotRelease { .. } => "slot_release",
            RequestPayload::SlotSwap { .. } => "slot_swap",
            RequestPayload::ExchangeRequest { .. } => "exchange_request",
        }
    }

    /// The other member a swap or exchange is addressed to
    pub fn target_user(&self) -> Option<Uuid> {
        match self {
            RequestPayload::SlotSwap { target_user_id, .. }
            | RequestPayload::ExchangeRequest { target_user_id, .. } => Some(*target_user_id),
            RequestPayload::TimeRequest { .. }
            | RequestPayload::TimeChange { .. }
            | RequestPayload::SlotRelease { .. } => None,
        }
    }
}

/// A request in a room's negotiation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub payload: RequestPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_by: Option<Uuid>,
}

impl Request {
    pub fn new(requester_id: Uuid, payload: RequestPayload, message: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            payload,
            message,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
            responded_by: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Whether `user_id` takes part in this request on either side
    pub fn involves(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.payload.target_user() == Some(user_id)
    }
}
