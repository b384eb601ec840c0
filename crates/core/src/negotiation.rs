//! Request/negotiation store
//!
//! Requests are the audit trail above the ledger. A request is decided
//! exactly once; approval applies its ledger effect before the room is
//! saved, rejection only records the answer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ledger::validate_day;
use crate::models::{
    Decision, Request, RequestPayload, RequestStatus, Room, SlotOrigin, TimeSlot,
};
use crate::permissions::RoomAction;

impl Room {
    /// Record a pending request from a participant
    pub fn create_request(
        &mut self,
        requester_id: Uuid,
        payload: RequestPayload,
        message: Option<String>,
    ) -> Result<Uuid> {
        self.require(requester_id, RoomAction::CreateRequests)?;

        match &payload {
            RequestPayload::TimeRequest { slot } | RequestPayload::SlotRelease { slot } => {
                validate_day(&slot.day)?;
            }
            RequestPayload::TimeChange { from, to } => {
                validate_day(&from.day)?;
                validate_day(&to.day)?;
            }
            RequestPayload::SlotSwap {
                slot,
                target_user_id,
            } => {
                validate_day(&slot.day)?;
                self.check_counterpart(requester_id, *target_user_id)?;
            }
            RequestPayload::ExchangeRequest { .. } => {
                return Err(Error::Validation(
                    "Exchange requests are raised by the exchange resolver".into(),
                ));
            }
        }

        Ok(self.push_request(requester_id, payload, message))
    }

    pub(crate) fn push_request(
        &mut self,
        requester_id: Uuid,
        payload: RequestPayload,
        message: Option<String>,
    ) -> Uuid {
        let request = Request::new(requester_id, payload, message);
        let id = request.id;
        self.requests.push(request);
        id
    }

    pub(crate) fn check_counterpart(&self, requester_id: Uuid, target_id: Uuid) -> Result<()> {
        if target_id == requester_id {
            return Err(Error::Validation(
                "A request cannot be addressed to yourself".into(),
            ));
        }
        if !self.is_participant(target_id) {
            return Err(Error::NotFound(format!(
                "Member {} in room {}",
                target_id, self.id
            )));
        }
        Ok(())
    }

    /// Approve or reject a pending request
    pub fn handle_request(
        &mut self,
        request_id: Uuid,
        actor_id: Uuid,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus> {
        let index = self
            .requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| Error::NotFound(format!("Request {}", request_id)))?;

        let request = &self.requests[index];
        if !request.is_pending() {
            return Err(Error::Validation(format!(
                "Request {} was already {:?}",
                request_id, request.status
            )));
        }

        match request.payload.target_user() {
            Some(target) if target != actor_id => {
                return Err(Error::PermissionDenied(
                    "Only the member this request is addressed to can decide it".into(),
                ));
            }
            Some(_) => {}
            None => {
                self.require(actor_id, RoomAction::DecideOwnerRequests)?;
            }
        }

        if decision == Decision::Approve {
            let requester_id = request.requester_id;
            let payload = request.payload.clone();
            self.apply_approval(requester_id, &payload)?;
            self.reevaluate_conflicts();
        }

        let request = &mut self.requests[index];
        request.status = decision.status();
        request.responded_at = Some(now);
        request.responded_by = Some(actor_id);
        Ok(request.status)
    }

    fn apply_approval(&mut self, requester_id: Uuid, payload: &RequestPayload) -> Result<()> {
        match payload {
            RequestPayload::TimeRequest { slot } => {
                self.time_slots
                    .push(TimeSlot::from_spec(requester_id, slot, SlotOrigin::Requested));
            }
            RequestPayload::TimeChange { from, to } => {
                let index = self
                    .time_slots
                    .iter()
                    .position(|s| s.matches_spec(requester_id, from))
                    .ok_or_else(|| {
                        Error::NotFound(format!("Slot to change on {} at {}", from.day, from.range))
                    })?;
                self.time_slots.remove(index);
                self.time_slots
                    .push(TimeSlot::from_spec(requester_id, to, SlotOrigin::Requested));
            }
            RequestPayload::SlotRelease { slot } => {
                let index = self
                    .time_slots
                    .iter()
                    .position(|s| s.matches_spec(requester_id, slot))
                    .ok_or_else(|| {
                        Error::NotFound(format!("Slot to release on {} at {}", slot.day, slot.range))
                    })?;
                self.time_slots.remove(index);
            }
            RequestPayload::SlotSwap {
                slot,
                target_user_id,
            } => {
                let held = self
                    .time_slots
                    .iter_mut()
                    .find(|s| s.matches_spec(*target_user_id, slot))
                    .ok_or_else(|| {
                        Error::NotFound(format!("Slot to swap on {} at {}", slot.day, slot.range))
                    })?;
                held.user_id = requester_id;
            }
            RequestPayload::ExchangeRequest {
                source,
                occupied,
                target_user_id,
                ..
            } => {
                // Both sides must still hold exactly what was snapshotted
                let still_held = |snapshot: &TimeSlot, owner: Uuid| {
                    self.time_slots
                        .iter()
                        .any(|s| s.id == snapshot.id && s.user_id == owner)
                };
                if !source.iter().all(|s| still_held(s, requester_id))
                    || !occupied.iter().all(|s| still_held(s, *target_user_id))
                {
                    return Err(Error::NotFound(
                        "The slots in this exchange have changed since it was requested".into(),
                    ));
                }

                for slot in self.time_slots.iter_mut() {
                    if source.iter().any(|s| s.id == slot.id) {
                        slot.user_id = *target_user_id;
                    } else if occupied.iter().any(|s| s.id == slot.id) {
                        slot.user_id = requester_id;
                    }
                }
            }
        }
        Ok(())
    }

    /// Requests `user_id` sent or is expected to decide
    pub fn requests_for(&self, user_id: Uuid) -> Vec<&Request> {
        let is_owner = self.is_owner(user_id);
        self.requests
            .iter()
            .filter(|r| {
                r.involves(user_id) || (is_owner && r.payload.target_user().is_none())
            })
            .collect()
    }
}
