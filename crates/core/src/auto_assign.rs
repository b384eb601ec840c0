//! Greedy auto-assignment of pending time requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::interval::{DayKey, TimeRange};
use crate::models::{RequestPayload, RequestStatus, Room, SlotOrigin, SlotSpec, TimeSlot};
use crate::permissions::RoomAction;

/// A time request left pending because its interval was taken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoAssignConflict {
    pub requester_id: Uuid,
    pub day: DayKey,
    pub range: TimeRange,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AutoAssignReport {
    pub assigned_count: usize,
    pub conflicts: Vec<AutoAssignConflict>,
}

impl Room {
    /// Approve every pending time request that fits the ledger as it stands,
    /// in request order. Earlier approvals in the same run are visible to
    /// later checks.
    pub fn auto_assign(&mut self, actor_id: Uuid, now: DateTime<Utc>) -> Result<AutoAssignReport> {
        self.require(actor_id, RoomAction::AutoAssign)?;

        let pending: Vec<(usize, Uuid, SlotSpec)> = self
            .requests
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending())
            .filter_map(|(index, r)| match &r.payload {
                RequestPayload::TimeRequest { slot } => Some((index, r.requester_id, slot.clone())),
                _ => None,
            })
            .collect();

        if pending.is_empty() {
            return Err(Error::NoWork(
                "There are no pending time requests to assign".into(),
            ));
        }

        let mut report = AutoAssignReport::default();
        for (index, requester_id, spec) in pending {
            let interval = spec.interval();
            if self.collisions(&interval).next().is_some() {
                report.conflicts.push(AutoAssignConflict {
                    requester_id,
                    day: spec.day,
                    range: spec.range,
                });
                continue;
            }

            self.time_slots
                .push(TimeSlot::from_spec(requester_id, &spec, SlotOrigin::AutoAssigned));
            let request = &mut self.requests[index];
            request.status = RequestStatus::Approved;
            request.responded_at = Some(now);
            request.responded_by = Some(actor_id);
            report.assigned_count += 1;
        }

        self.reevaluate_conflicts();
        Ok(report)
    }
}
