//! Time-slot ledger
//!
//! Overlapping slots are never rejected; they are flagged `conflict` so the
//! owner can see and resolve them. Every mutation re-evaluates the whole
//! ledger.

use chrono::{DateTime, Datelike, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::interval::{overlaps, DayInterval, DayKey, TimeRange};
use crate::models::{Room, SlotOrigin, SlotSpec, SlotStatus, TimeSlot};
use crate::permissions::RoomAction;

/// Reject days whose date and weekday disagree
pub(crate) fn validate_day(day: &DayKey) -> Result<()> {
    match day.date {
        Some(date) if date.weekday() != day.weekday => Err(Error::Validation(format!(
            "{} is a {}, not a {}",
            date,
            date.weekday(),
            day.weekday
        ))),
        _ => Ok(()),
    }
}

impl Room {
    /// Accumulate the caller's slots; an empty list clears them all.
    /// Returns how many slots were added.
    pub fn submit_slots(&mut self, user_id: Uuid, specs: &[SlotSpec]) -> Result<usize> {
        self.require(user_id, RoomAction::SubmitSlots)?;

        if specs.is_empty() {
            self.time_slots.retain(|s| s.user_id != user_id);
            self.reevaluate_conflicts();
            return Ok(0);
        }

        for spec in specs {
            validate_day(&spec.day)?;
        }

        let mut added = 0;
        for spec in specs {
            if self.time_slots.iter().any(|s| s.matches_spec(user_id, spec)) {
                continue;
            }
            self.time_slots
                .push(TimeSlot::from_spec(user_id, spec, SlotOrigin::Submitted));
            added += 1;
        }

        self.reevaluate_conflicts();
        Ok(added)
    }

    /// Remove one of the caller's own slots
    pub fn remove_slot(&mut self, user_id: Uuid, day: &DayKey, range: &TimeRange) -> Result<TimeSlot> {
        self.require(user_id, RoomAction::SubmitSlots)?;

        let index = self
            .time_slots
            .iter()
            .position(|s| s.matches(user_id, day, range))
            .ok_or_else(|| Error::NotFound(format!("Your slot on {} at {}", day, range)))?;

        let removed = self.time_slots.remove(index);
        self.reevaluate_conflicts();
        Ok(removed)
    }

    /// Owner force-assignment of a slot to a member
    pub fn assign_slot(
        &mut self,
        actor_id: Uuid,
        target_id: Uuid,
        spec: &SlotSpec,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        self.require(actor_id, RoomAction::AssignSlots)?;
        validate_day(&spec.day)?;

        if self.member(target_id).is_none() {
            return Err(Error::NotFound(format!(
                "Member {} in room {}",
                target_id, self.id
            )));
        }

        let slot =
            TimeSlot::from_spec(target_id, spec, SlotOrigin::OwnerAssigned).assigned(actor_id, now);
        let slot_id = slot.id;
        self.time_slots.push(slot);
        self.reevaluate_conflicts();
        Ok(slot_id)
    }

    /// Owner deletion of any slot by id
    pub fn delete_slot(&mut self, actor_id: Uuid, slot_id: Uuid) -> Result<TimeSlot> {
        self.require(actor_id, RoomAction::DeleteAnySlot)?;

        let index = self
            .time_slots
            .iter()
            .position(|s| s.id == slot_id)
            .ok_or_else(|| Error::NotFound(format!("Slot {}", slot_id)))?;

        let removed = self.time_slots.remove(index);
        self.reevaluate_conflicts();
        Ok(removed)
    }

    /// Flag every colliding slot and return the rest to their resting
    /// status. Returns the number of slots in conflict.
    pub fn reevaluate_conflicts(&mut self) -> usize {
        let count = self.time_slots.len();
        let mut conflicted = vec![false; count];

        for i in 0..count {
            for j in (i + 1)..count {
                if self.time_slots[i].collides_with(&self.time_slots[j]) {
                    conflicted[i] = true;
                    conflicted[j] = true;
                }
            }
        }

        for (slot, in_conflict) in self.time_slots.iter_mut().zip(&conflicted) {
            slot.status = if *in_conflict {
                SlotStatus::Conflict
            } else {
                slot.origin.resting_status()
            };
        }

        let conflicts = conflicted.iter().filter(|c| **c).count();
        debug!(room_id = %self.id, slots = count, conflicts, "Re-evaluated conflicts");
        conflicts
    }

    /// Ledger slots that collide with `interval`
    pub fn collisions<'a>(&'a self, interval: &'a DayInterval) -> impl Iterator<Item = &'a TimeSlot> {
        self.time_slots
            .iter()
            .filter(move |s| overlaps(&s.interval(), interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorConfig;
    use chrono::{NaiveDate, Weekday};

    struct Fixture {
        room: Room,
        owner: Uuid,
        a: Uuid,
        b: Uuid,
    }

    fn fixture() -> Fixture {
        let colors = ColorConfig::default();
        let owner = Uuid::new_v4();
        let mut room = Room::new("Ledger".into(), owner, "LEDG01".into(), 5, colors.owner_color.clone())
            .unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        room.join(a, &colors).unwrap();
        room.join(b, &colors).unwrap();
        Fixture { room, owner, a, b }
    }

    fn spec(day: Weekday, start: &str, end: &str) -> SlotSpec {
        SlotSpec::new(DayKey::weekly(day), TimeRange::parse(start, end).unwrap())
    }

    fn assert_conflict_flags_consistent(room: &Room) {
        for (i, x) in room.time_slots.iter().enumerate() {
            let collides = room
                .time_slots
                .iter()
                .enumerate()
                .any(|(j, y)| i != j && x.collides_with(y));
            assert_eq!(x.status == SlotStatus::Conflict, collides, "slot {:?}", x);
        }
    }

    #[test]
    fn test_overlapping_submissions_conflict_then_revert() {
        let Fixture { mut room, owner, a, b } = fixture();
        room.submit_slots(a, &[spec(Weekday::Mon, "10:00", "11:00")]).unwrap();
        room.submit_slots(b, &[spec(Weekday::Mon, "10:30", "11:30")]).unwrap();
        assert!(room.time_slots.iter().all(|s| s.status == SlotStatus::Conflict));

        let b_slot = room.slots_of(b).next().unwrap().id;
        room.delete_slot(owner, b_slot).unwrap();
        let a_slot = room.slots_of(a).next().unwrap();
        assert_eq!(a_slot.status, SlotStatus::Confirmed);
        assert_conflict_flags_consistent(&room);
    }

    #[test]
    fn test_identical_submission_is_deduplicated() {
        let Fixture { mut room, a, .. } = fixture();
        let slot = spec(Weekday::Tue, "09:00", "10:00");
        assert_eq!(room.submit_slots(a, &[slot.clone()]).unwrap(), 1);
        assert_eq!(room.submit_slots(a, &[slot]).unwrap(), 0);
        assert_eq!(room.slots_of(a).count(), 1);
    }

    #[test]
    fn test_empty_submission_clears_only_callers_slots() {
        let Fixture { mut room, a, b, .. } = fixture();
        room.submit_slots(a, &[spec(Weekday::Tue, "09:00", "10:00")]).unwrap();
        room.submit_slots(b, &[spec(Weekday::Tue, "11:00", "12:00")]).unwrap();
        room.submit_slots(a, &[]).unwrap();
        assert_eq!(room.slots_of(a).count(), 0);
        assert_eq!(room.slots_of(b).count(), 1);
    }

    #[test]
    fn test_outsider_cannot_submit() {
        let Fixture { mut room, .. } = fixture();
        let err = room
            .submit_slots(Uuid::new_v4(), &[spec(Weekday::Tue, "09:00", "10:00")])
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[test]
    fn test_remove_slot_is_own_only() {
        let Fixture { mut room, a, b, .. } = fixture();
        let slot = spec(Weekday::Wed, "09:00", "10:00");
        room.submit_slots(a, &[slot.clone()]).unwrap();

        let err = room.remove_slot(b, &slot.day, &slot.range).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        room.remove_slot(a, &slot.day, &slot.range).unwrap();
        assert!(room.time_slots.is_empty());
    }

    #[test]
    fn test_assign_slot_marks_conflict_and_reverts_to_assigned() {
        let Fixture { mut room, owner, a, b } = fixture();
        room.submit_slots(a, &[spec(Weekday::Thu, "14:00", "15:00")]).unwrap();
        let assigned = room
            .assign_slot(owner, b, &spec(Weekday::Thu, "14:30", "15:30"), Utc::now())
            .unwrap();
        assert!(room.time_slots.iter().all(|s| s.status == SlotStatus::Conflict));

        room.submit_slots(a, &[]).unwrap();
        let slot = room.time_slots.iter().find(|s| s.id == assigned).unwrap();
        assert_eq!(slot.status, SlotStatus::Assigned);
        assert_eq!(slot.assigned_by, Some(owner));
    }

    #[test]
    fn test_assign_slot_requires_owner_and_member_target() {
        let Fixture { mut room, owner, a, b } = fixture();
        let slot = spec(Weekday::Fri, "08:00", "09:00");
        assert!(matches!(
            room.assign_slot(a, b, &slot, Utc::now()),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            room.assign_slot(owner, Uuid::new_v4(), &slot, Utc::now()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_date_weekday_mismatch_rejected() {
        let Fixture { mut room, a, .. } = fixture();
        let tuesday = NaiveDate::from_ymd_opt(2026, 10, 13).unwrap();
        let bad = SlotSpec::new(
            DayKey {
                weekday: Weekday::Mon,
                date: Some(tuesday),
            },
            TimeRange::parse("09:00", "10:00").unwrap(),
        );
        assert!(matches!(room.submit_slots(a, &[bad]), Err(Error::Validation(_))));
    }

    #[test]
    fn test_three_way_overlap_all_flagged() {
        let Fixture { mut room, owner, a, b } = fixture();
        room.submit_slots(a, &[spec(Weekday::Mon, "09:00", "10:00")]).unwrap();
        room.submit_slots(b, &[spec(Weekday::Mon, "09:30", "10:30")]).unwrap();
        room.submit_slots(owner, &[spec(Weekday::Mon, "10:15", "11:00"), spec(Weekday::Mon, "12:00", "13:00")])
            .unwrap();
        assert_eq!(room.reevaluate_conflicts(), 3);
        assert_conflict_flags_consistent(&room);
    }
}
