//! Smart exchange: relocate one movable block to a preferred day and time
//!
//! A block is validated against the owner's and the requester's recurring
//! availability, then either moved straight away (destination free) or
//! escalated to whoever holds the destination as an `exchange_request`.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::interval::{
    date_in_week, format_windows, intersect, merge_same_day, week_start, ClockTime, DayInterval,
    DayKey, TimeRange,
};
use crate::models::{
    windows_for, AvailabilityEntry, RequestPayload, Room, SlotOrigin, SlotStatus, TimeSlot,
};
use crate::permissions::RoomAction;

/// A contiguous run of one user's movable slots sharing a day and subject
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub day: DayKey,
    /// Span from the first segment's start to the last segment's end
    pub range: TimeRange,
    pub subject: String,
    /// Segments ordered by start
    pub slots: Vec<TimeSlot>,
}

impl Block {
    pub fn duration_minutes(&self) -> u16 {
        self.range.duration_minutes()
    }

    fn in_week_of(&self, today: NaiveDate) -> bool {
        match self.day.date {
            Some(date) => week_start(date) == week_start(today),
            None => true,
        }
    }
}

/// Recurring availability of both sides of an exchange
#[derive(Debug, Clone, Copy)]
pub struct ExchangePreferences<'a> {
    pub owner: &'a [AvailabilityEntry],
    pub requester: &'a [AvailabilityEntry],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExchangeOutcome {
    /// The block already sits at the destination
    Unchanged { day: DayKey, range: TimeRange },
    /// The destination was free and the block now lives there
    Moved {
        day: DayKey,
        range: TimeRange,
        slot_ids: Vec<Uuid>,
    },
    /// The destination is held; a pending exchange request awaits its holder
    NeedsApproval { occupied_by: Uuid, request_id: Uuid },
}

/// The user's movable slots folded into blocks
pub fn movable_blocks(room: &Room, user_id: Uuid) -> Vec<Block> {
    let mut slots: Vec<&TimeSlot> = room
        .slots_of(user_id)
        .filter(|s| s.origin.is_movable())
        .collect();
    slots.sort_by(|a, b| {
        (a.day.date, a.day.weekday.num_days_from_monday(), &a.subject, a.range.start())
            .cmp(&(b.day.date, b.day.weekday.num_days_from_monday(), &b.subject, b.range.start()))
    });

    let mut blocks: Vec<Block> = Vec::new();
    for slot in slots {
        match blocks.last_mut() {
            Some(block)
                if block.day == slot.day
                    && block.subject == slot.subject
                    && slot.range.start() <= block.range.end() =>
            {
                block.range = block.range.cover(&slot.range);
                block.slots.push(slot.clone());
            }
            _ => blocks.push(Block {
                day: slot.day,
                range: slot.range,
                subject: slot.subject.clone(),
                slots: vec![slot.clone()],
            }),
        }
    }
    blocks
}

/// Pick the block to move toward `target_day`: one in the current week on
/// another day, else one already on `target_day`, else the first.
pub fn select_block(blocks: &[Block], target_day: Weekday, today: NaiveDate) -> Option<&Block> {
    blocks
        .iter()
        .find(|b| b.in_week_of(today) && b.day.weekday != target_day)
        .or_else(|| blocks.iter().find(|b| b.day.weekday == target_day))
        .or_else(|| blocks.first())
}

/// Windows both sides prefer on `day`
pub fn shared_windows(prefs: &ExchangePreferences<'_>, day: &DayKey) -> Result<Vec<TimeRange>> {
    let owner = merge_same_day(&windows_for(prefs.owner, day));
    if owner.is_empty() {
        return Err(Error::NotPreferred(format!(
            "{} is not the owner's preferred day",
            day.weekday
        )));
    }

    let requester = merge_same_day(&windows_for(prefs.requester, day));
    if requester.is_empty() {
        return Err(Error::NotPreferred(format!(
            "{} is not your preferred day",
            day.weekday
        )));
    }

    let windows = intersect(&owner, &requester);
    if windows.is_empty() {
        return Err(Error::NoOverlap(format!(
            "Your preferred times on {} ({}) never meet the owner's ({})",
            day.weekday,
            format_windows(&requester),
            format_windows(&owner)
        )));
    }
    Ok(windows)
}

impl Room {
    /// Move one of the requester's movable blocks to `target_day`, at
    /// `target_time` when given.
    pub fn smart_exchange(
        &mut self,
        requester_id: Uuid,
        target_day: Weekday,
        target_time: Option<ClockTime>,
        prefs: &ExchangePreferences<'_>,
        today: NaiveDate,
    ) -> Result<ExchangeOutcome> {
        self.require(requester_id, RoomAction::RequestExchange)?;

        let blocks = movable_blocks(self, requester_id);
        let block = select_block(&blocks, target_day, today)
            .ok_or_else(|| {
                Error::NoAssignment("You have no assigned time that can be moved".into())
            })?
            .clone();

        let destination_day = match block.day.date {
            Some(date) => DayKey::on(date_in_week(date, target_day)),
            None => DayKey::weekly(target_day),
        };
        let windows = shared_windows(prefs, &destination_day)?;

        let crosses_days = block.day.weekday != target_day;
        let start = match target_time {
            Some(time) => time,
            None if crosses_days => windows[0].start(),
            None => block.range.start(),
        };
        let out_of_window = || Error::OutOfWindow {
            windows: format_windows(&windows),
        };
        let destination = block.range.starting_at(start).ok_or_else(out_of_window)?;
        if !windows.iter().any(|w| w.contains(&destination)) {
            return Err(out_of_window());
        }

        if destination_day == block.day && destination == block.range {
            return Ok(ExchangeOutcome::Unchanged {
                day: block.day,
                range: block.range,
            });
        }

        let interval = DayInterval::new(destination_day, destination);
        let occupier = self
            .collisions(&interval)
            .find(|s| s.user_id != requester_id)
            .map(|s| s.user_id);

        match occupier {
            Some(occupied_by) => {
                let request_id =
                    self.escalate_exchange(requester_id, occupied_by, block, interval);
                debug!(room_id = %self.id, %requester_id, %occupied_by, "Exchange needs approval");
                Ok(ExchangeOutcome::NeedsApproval {
                    occupied_by,
                    request_id,
                })
            }
            None => {
                let slot_ids = self.relocate_block(&block, interval)?;
                Ok(ExchangeOutcome::Moved {
                    day: destination_day,
                    range: destination,
                    slot_ids,
                })
            }
        }
    }

    fn relocate_block(&mut self, block: &Block, to: DayInterval) -> Result<Vec<Uuid>> {
        let mut moved = Vec::with_capacity(block.slots.len());
        for segment in &block.slots {
            let range = segment
                .range
                .shifted(block.range.start(), to.range.start())
                .ok_or_else(|| Error::Validation(format!("{} cannot move to {}", segment.range, to.range)))?;
            moved.push(TimeSlot {
                id: Uuid::new_v4(),
                day: to.day,
                range,
                status: SlotStatus::Assigned,
                origin: SlotOrigin::Exchanged,
                ..segment.clone()
            });
        }

        let slot_ids = moved.iter().map(|s| s.id).collect();
        self.time_slots
            .retain(|s| !block.slots.iter().any(|b| b.id == s.id));
        self.time_slots.extend(moved);
        self.reevaluate_conflicts();
        Ok(slot_ids)
    }

    /// Pending exchange request to `occupied_by`, reusing an identical one
    fn escalate_exchange(
        &mut self,
        requester_id: Uuid,
        occupied_by: Uuid,
        block: Block,
        to: DayInterval,
    ) -> Uuid {
        let occupied: Vec<TimeSlot> = self
            .collisions(&to)
            .filter(|s| s.user_id == occupied_by)
            .cloned()
            .collect();

        // Identical means the same slots on both sides, not just the same destination
        let same_slots = |a: &[TimeSlot], b: &[TimeSlot]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
        };
        let existing = self.requests.iter().find(|r| {
            r.is_pending()
                && r.requester_id == requester_id
                && matches!(
                    &r.payload,
                    RequestPayload::ExchangeRequest {
                        source,
                        occupied: snapshot,
                        target_user_id,
                        desired_day,
                        desired_range,
                    } if *target_user_id == occupied_by
                        && *desired_day == to.day
                        && *desired_range == to.range
                        && same_slots(source, &block.slots)
                        && same_slots(snapshot, &occupied)
                )
        });
        if let Some(request) = existing {
            return request.id;
        }

        let message = format!("Exchange {} {} for {} {}", block.day, block.range, to.day, to.range);

        self.push_request(
            requester_id,
            RequestPayload::ExchangeRequest {
                source: block.slots,
                occupied,
                desired_day: to.day,
                desired_range: to.range,
                target_user_id: occupied_by,
            },
            Some(message),
        )
    }
}
