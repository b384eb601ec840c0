//! Room & membership registry
//!
//! Invite codes, member colors, joining, removal, and room edits. Every
//! mutation here is a method on [`Room`] so the membership invariants live in
//! one place.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::ColorConfig;
use crate::error::{Error, Result};
use crate::models::{Member, Room, RoomRole, RoomSettings};
use crate::permissions::RoomAction;

/// Generate a random uppercase alphanumeric invite code
pub fn generate_invite_code(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(length)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Normalize user-typed invite codes
pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// First palette color not already taken; never the owner color.
///
/// Once the palette is exhausted, colors are generated around the hue wheel.
pub fn assign_color<'a>(existing: impl IntoIterator<Item = &'a str>, colors: &ColorConfig) -> String {
    let mut taken: HashSet<String> = existing
        .into_iter()
        .map(|c| c.to_ascii_uppercase())
        .collect();
    taken.insert(colors.owner_color.to_ascii_uppercase());

    if let Some(color) = colors
        .palette
        .iter()
        .find(|c| !taken.contains(&c.to_ascii_uppercase()))
    {
        return color.clone();
    }

    (0..4096)
        .map(generated_color)
        .find(|c| !taken.contains(c))
        .unwrap_or_else(|| {
            let bytes = Uuid::new_v4().into_bytes();
            format!("#{:02X}{:02X}{:02X}", bytes[0], bytes[1], bytes[2])
        })
}

/// Golden-angle hue steps at fixed saturation and lightness
fn generated_color(index: usize) -> String {
    let hue = (index as f64 * 137.508) % 360.0;
    hsl_to_hex(hue, 0.65, 0.55)
}

fn hsl_to_hex(h: f64, s: f64, l: f64) -> String {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r, g, b) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    format!("#{:02X}{:02X}{:02X}", channel(r), channel(g), channel(b))
}

/// What a join did to the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinOutcome {
    /// The owner joining their own room
    Owner,
    /// Already a member; nothing changed
    AlreadyMember,
    /// Duplicate records were collapsed into one
    Repaired,
    /// Newly added
    Joined,
}

/// Owner edits to a room; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<u32>,
    pub settings: Option<RoomSettings>,
}

impl Room {
    /// Add `user_id` as a member, repairing duplicate records first
    pub fn join(&mut self, user_id: Uuid, colors: &ColorConfig) -> Result<JoinOutcome> {
        if self.is_owner(user_id) {
            return Ok(JoinOutcome::Owner);
        }

        if self.repair_duplicate_membership(user_id, colors) {
            return Ok(JoinOutcome::Repaired);
        }

        if self.member(user_id).is_some() {
            return Ok(JoinOutcome::AlreadyMember);
        }

        if self.member_count() >= self.max_members as usize {
            return Err(Error::Capacity {
                max: self.max_members,
            });
        }

        let color = assign_color(self.members.iter().map(|m| m.color.as_str()), colors);
        self.members
            .push(Member::new(user_id, RoomRole::Member, color));
        Ok(JoinOutcome::Joined)
    }

    /// Collapse several records for one user into a single freshly colored one
    fn repair_duplicate_membership(&mut self, user_id: Uuid, colors: &ColorConfig) -> bool {
        let records = self.members.iter().filter(|m| m.user_id == user_id).count();
        if records <= 1 {
            return false;
        }

        warn!(room_id = %self.id, user_id = %user_id, records, "Repairing duplicate membership");

        let joined_at = self
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .map(|m| m.joined_at)
            .min();
        self.members.retain(|m| m.user_id != user_id);

        let color = assign_color(self.members.iter().map(|m| m.color.as_str()), colors);
        let mut member = Member::new(user_id, RoomRole::Member, color);
        if let Some(joined_at) = joined_at {
            member.joined_at = joined_at;
        }
        self.members.push(member);
        true
    }

    /// Remove a member and everything that references them
    pub fn remove_member(&mut self, actor_id: Uuid, member_id: Uuid) -> Result<Member> {
        self.require(actor_id, RoomAction::RemoveMembers)?;

        if self.is_owner(member_id) {
            return Err(Error::SelfRemoval);
        }

        let removed = self
            .member(member_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Member {} in room {}", member_id, self.id)))?;

        self.members.retain(|m| m.user_id != member_id);
        self.time_slots.retain(|s| s.user_id != member_id);
        self.requests.retain(|r| !r.involves(member_id));
        self.reevaluate_conflicts();

        Ok(removed)
    }

    /// Apply owner edits
    pub fn update(&mut self, actor_id: Uuid, changes: RoomUpdate) -> Result<()> {
        self.require(actor_id, RoomAction::EditRoom)?;

        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(Error::Validation("Room name must not be empty".into()));
            }
            self.name = name;
        }

        if let Some(description) = changes.description {
            let description = description.trim().to_string();
            self.description = (!description.is_empty()).then_some(description);
        }

        if let Some(max_members) = changes.max_members {
            if max_members == 0 || (max_members as usize) < self.member_count() {
                return Err(Error::Validation(format!(
                    "Capacity {} is below the current {} members",
                    max_members,
                    self.member_count()
                )));
            }
            self.max_members = max_members;
        }

        if let Some(settings) = changes.settings {
            self.settings = settings;
        }

        Ok(())
    }
}
