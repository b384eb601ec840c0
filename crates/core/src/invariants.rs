//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{Room, RoomRole, SlotStatus};

/// Validate that a Room aggregate is internally consistent
pub fn assert_room_invariants(room: &Room, owner_color: &str) {
    debug_assert!(!room.name.trim().is_empty(), "Room {} has empty name", room.id);

    assert_membership_invariants(room, owner_color);
    assert_conflict_flags(room);
}

/// One member record per user, unique colors, owner color reserved
pub fn assert_membership_invariants(room: &Room, owner_color: &str) {
    let mut users = HashSet::new();
    let mut colors = HashSet::new();

    for member in &room.members {
        debug_assert!(
            users.insert(member.user_id),
            "Room {} has duplicate member records for {}",
            room.id,
            member.user_id
        );

        let is_owner = member.user_id == room.owner_id;
        debug_assert_eq!(
            is_owner,
            member.role == RoomRole::Owner,
            "Room {} member {} has role {:?}",
            room.id,
            member.user_id,
            member.role
        );
        debug_assert!(
            is_owner || !member.color.eq_ignore_ascii_case(owner_color),
            "Room {} member {} holds the owner color",
            room.id,
            member.user_id
        );
        debug_assert!(
            colors.insert(member.color.to_ascii_uppercase()),
            "Room {} hands color {} to more than one member",
            room.id,
            member.color
        );
    }
}

/// A slot is flagged `conflict` exactly when it collides with another
pub fn assert_conflict_flags(room: &Room) {
    for (i, slot) in room.time_slots.iter().enumerate() {
        let collides = room
            .time_slots
            .iter()
            .enumerate()
            .any(|(j, other)| i != j && slot.collides_with(other));
        debug_assert_eq!(
            slot.status == SlotStatus::Conflict,
            collides,
            "Room {} slot {} has status {:?}",
            room.id,
            slot.id,
            slot.status
        );
    }
}
