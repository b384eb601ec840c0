//! Permission system for room operations

use crate::models::RoomRole;

/// Actions that can be performed in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    // Room management
    ViewRoom,
    EditRoom,
    DeleteRoom,
    RemoveMembers,

    // Ledger
    SubmitSlots,
    AssignSlots,
    DeleteAnySlot,
    AutoAssign,

    // Negotiation
    CreateRequests,
    DecideOwnerRequests,
    RequestExchange,
}

impl RoomAction {
    pub fn describe(&self) -> &'static str {
        match self {
            RoomAction::ViewRoom => "view this room",
            RoomAction::EditRoom => "edit room settings",
            RoomAction::DeleteRoom => "delete this room",
            RoomAction::RemoveMembers => "remove members",
            RoomAction::SubmitSlots => "submit slots",
            RoomAction::AssignSlots => "assign slots to members",
            RoomAction::DeleteAnySlot => "delete other members' slots",
            RoomAction::AutoAssign => "run auto-assignment",
            RoomAction::CreateRequests => "create requests",
            RoomAction::DecideOwnerRequests => "decide this request",
            RoomAction::RequestExchange => "request an exchange",
        }
    }
}

/// Permission matrix for room roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: RoomRole, action: RoomAction) -> bool {
        match action {
            // Every participant
            RoomAction::ViewRoom
            | RoomAction::SubmitSlots
            | RoomAction::CreateRequests
            | RoomAction::RequestExchange => role >= RoomRole::Member,

            // Owner only
            RoomAction::EditRoom
            | RoomAction::DeleteRoom
            | RoomAction::RemoveMembers
            | RoomAction::AssignSlots
            | RoomAction::DeleteAnySlot
            | RoomAction::AutoAssign
            | RoomAction::DecideOwnerRequests => role == RoomRole::Owner,
        }
    }
}
