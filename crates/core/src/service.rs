//! Scheduler service
//!
//! Runs every engine operation as load → mutate in memory → conditional save.
//! A save that loses a race reloads the room and re-runs the mutation, so
//! each attempt decides against fresh state. Operations that leave the room
//! unchanged are not written back.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auto_assign::AutoAssignReport;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::exchange::{ExchangeOutcome, ExchangePreferences};
use crate::interval::{ClockTime, DayKey, TimeRange};
use crate::invariants::assert_room_invariants;
use crate::models::{
    AvailabilityEntry, Decision, Member, Request, RequestPayload, Room, RoomSettings, SlotSpec,
    TimeSlot, User,
};
use crate::permissions::RoomAction;
use crate::registry::{generate_invite_code, normalize_invite_code, JoinOutcome, RoomUpdate};
use crate::storage::Storage;

/// A ledger slot resolved for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: TimeSlot,
    /// Display name, or the user id when the user is unknown
    pub user_name: String,
    /// Member color; `None` once the user has left the room
    pub color: Option<String>,
}

/// Parameters for a new room
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub description: Option<String>,
    pub max_members: u32,
    pub settings: RoomSettings,
}

pub struct Scheduler<S: Storage> {
    store: S,
    config: EngineConfig,
}

impl<S: Storage> Scheduler<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn load_room(&self, room_id: Uuid) -> Result<Room> {
        self.store
            .find_room_by_id(room_id)?
            .ok_or_else(|| Error::NotFound(format!("Room {}", room_id)))
    }

    /// Apply `op` to the latest stored room and save it conditionally
    fn mutate<T, F>(&self, room_id: Uuid, mut op: F) -> Result<(Room, T)>
    where
        F: FnMut(&mut Room) -> Result<T>,
    {
        let attempts = self.config.storage.max_write_retries;
        for attempt in 1..=attempts {
            let mut room = self.load_room(room_id)?;
            let before = room.clone();
            let value = op(&mut room)?;
            if room == before {
                return Ok((room, value));
            }

            room.touch(Utc::now());
            assert_room_invariants(&room, &self.config.colors.owner_color);

            let expected = room.version;
            if self.store.save_room_if_version(&room, expected)? {
                room.version = expected + 1;
                return Ok((room, value));
            }
            warn!(%room_id, attempt, "Room changed during update, retrying");
        }

        Err(Error::WriteConflict { attempts })
    }

    // === Users and availability ===

    /// Mirror a user from the identity layer
    pub fn register_user(&self, user: &User) -> Result<()> {
        self.store.upsert_user(user)
    }

    /// Seed the recurring-availability store
    pub fn set_availability(&self, user_id: Uuid, entries: &[AvailabilityEntry]) -> Result<()> {
        self.store.replace_availability(user_id, entries)
    }

    // === Rooms and membership ===

    #[instrument(skip(self, new_room), fields(name = %new_room.name))]
    pub fn create_room(&self, owner_id: Uuid, new_room: NewRoom) -> Result<Room> {
        let mut room = Room::new(
            new_room.name,
            owner_id,
            String::new(),
            new_room.max_members,
            self.config.colors.owner_color.clone(),
        )?
        .with_settings(new_room.settings);
        if let Some(description) = new_room.description {
            room = room.with_description(description);
        }
        assert_room_invariants(&room, &self.config.colors.owner_color);

        // A concurrent creator can take a code between the check and the insert
        let attempts = self.config.invite.max_attempts;
        for attempt in 1..=attempts {
            room.invite_code = self.unused_invite_code()?;
            match self.store.create_room(&room) {
                Ok(()) => {
                    info!(room_id = %room.id, invite_code = %room.invite_code, "Room created");
                    return Ok(room);
                }
                Err(e) if e.is_constraint_violation() => {
                    warn!(invite_code = %room.invite_code, attempt, "Invite code taken, drawing again");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::Validation(format!(
            "No unused invite code found after {} attempts",
            attempts
        )))
    }

    fn unused_invite_code(&self) -> Result<String> {
        for _ in 0..self.config.invite.max_attempts {
            let code = generate_invite_code(self.config.invite.code_length);
            if !self.store.invite_code_exists(&code)? {
                return Ok(code);
            }
        }
        Err(Error::Validation(format!(
            "No unused invite code found after {} attempts",
            self.config.invite.max_attempts
        )))
    }

    pub fn get_room(&self, room_id: Uuid, actor_id: Uuid) -> Result<Room> {
        let room = self.load_room(room_id)?;
        room.require(actor_id, RoomAction::ViewRoom)?;
        Ok(room)
    }

    #[instrument(skip(self, changes))]
    pub fn update_room(&self, room_id: Uuid, actor_id: Uuid, changes: RoomUpdate) -> Result<Room> {
        let (room, ()) = self.mutate(room_id, |room| room.update(actor_id, changes.clone()))?;
        info!(%room_id, "Room updated");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub fn delete_room(&self, room_id: Uuid, actor_id: Uuid) -> Result<()> {
        let room = self.load_room(room_id)?;
        room.require(actor_id, RoomAction::DeleteRoom)?;
        if !self.store.delete_room(room_id)? {
            return Err(Error::NotFound(format!("Room {}", room_id)));
        }
        info!(%room_id, "Room deleted");
        Ok(())
    }

    pub fn list_rooms(&self, user_id: Uuid) -> Result<Vec<Room>> {
        self.store.list_rooms_for_user(user_id)
    }

    /// Join by invite code. Safe against concurrent joins: a lost race
    /// re-checks membership and capacity against the winner's state.
    #[instrument(skip(self, invite_code))]
    pub fn join_room(&self, invite_code: &str, user_id: Uuid) -> Result<(Room, JoinOutcome)> {
        let code = normalize_invite_code(invite_code);
        let room_id = self
            .store
            .find_room_by_invite_code(&code)?
            .map(|r| r.id)
            .ok_or_else(|| Error::NotFound(format!("Invite code {}", code)))?;

        let colors = &self.config.colors;
        let (room, outcome) = self.mutate(room_id, |room| room.join(user_id, colors))?;
        if outcome != JoinOutcome::AlreadyMember && outcome != JoinOutcome::Owner {
            info!(%room_id, %user_id, ?outcome, "Member joined");
        }
        Ok((room, outcome))
    }

    #[instrument(skip(self))]
    pub fn remove_member(&self, room_id: Uuid, actor_id: Uuid, member_id: Uuid) -> Result<Member> {
        let (_, removed) = self.mutate(room_id, |room| room.remove_member(actor_id, member_id))?;
        info!(%room_id, %member_id, "Member removed");
        Ok(removed)
    }

    // === Ledger ===

    /// Resolve slot owners for display
    pub fn slot_views(&self, room: &Room) -> Result<Vec<SlotView>> {
        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut views = Vec::with_capacity(room.time_slots.len());

        for slot in &room.time_slots {
            let user_name = match names.get(&slot.user_id) {
                Some(name) => name.clone(),
                None => {
                    let name = self
                        .store
                        .find_user_by_id(slot.user_id)?
                        .map(|u| u.display_name)
                        .unwrap_or_else(|| slot.user_id.to_string());
                    names.insert(slot.user_id, name.clone());
                    name
                }
            };
            views.push(SlotView {
                slot: slot.clone(),
                user_name,
                color: room.member(slot.user_id).map(|m| m.color.clone()),
            });
        }
        Ok(views)
    }

    pub fn list_slots(&self, room_id: Uuid, actor_id: Uuid) -> Result<Vec<SlotView>> {
        let room = self.get_room(room_id, actor_id)?;
        self.slot_views(&room)
    }

    #[instrument(skip(self, specs), fields(count = specs.len()))]
    pub fn submit_slots(&self, room_id: Uuid, user_id: Uuid, specs: &[SlotSpec]) -> Result<Vec<SlotView>> {
        let (room, added) = self.mutate(room_id, |room| room.submit_slots(user_id, specs))?;
        info!(%room_id, %user_id, added, "Slots submitted");
        self.slot_views(&room)
    }

    #[instrument(skip(self))]
    pub fn remove_slot(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        day: DayKey,
        range: TimeRange,
    ) -> Result<Vec<SlotView>> {
        let (room, _) = self.mutate(room_id, |room| room.remove_slot(user_id, &day, &range))?;
        info!(%room_id, %user_id, %day, %range, "Slot removed");
        self.slot_views(&room)
    }

    #[instrument(skip(self, spec))]
    pub fn assign_slot(
        &self,
        room_id: Uuid,
        actor_id: Uuid,
        target_id: Uuid,
        spec: &SlotSpec,
    ) -> Result<Vec<SlotView>> {
        let (room, slot_id) = self.mutate(room_id, |room| {
            room.assign_slot(actor_id, target_id, spec, Utc::now())
        })?;
        info!(%room_id, %target_id, %slot_id, "Slot assigned");
        self.slot_views(&room)
    }

    #[instrument(skip(self))]
    pub fn delete_slot(&self, room_id: Uuid, actor_id: Uuid, slot_id: Uuid) -> Result<Vec<SlotView>> {
        let (room, _) = self.mutate(room_id, |room| room.delete_slot(actor_id, slot_id))?;
        info!(%room_id, %slot_id, "Slot deleted");
        self.slot_views(&room)
    }

    // === Negotiation ===

    #[instrument(skip(self, payload, message), fields(kind = payload.type_name()))]
    pub fn create_request(
        &self,
        room_id: Uuid,
        requester_id: Uuid,
        payload: RequestPayload,
        message: Option<String>,
    ) -> Result<Request> {
        let (room, request_id) = self.mutate(room_id, |room| {
            room.create_request(requester_id, payload.clone(), message.clone())
        })?;
        info!(%room_id, %request_id, "Request created");
        stored_request(&room, request_id)
    }

    /// Decide a request; the room is found from the request id
    #[instrument(skip(self))]
    pub fn handle_request(&self, request_id: Uuid, actor_id: Uuid, decision: Decision) -> Result<Request> {
        let room_id = self
            .store
            .find_room_id_by_request(request_id)?
            .ok_or_else(|| Error::NotFound(format!("Request {}", request_id)))?;

        let (room, status) = self.mutate(room_id, |room| {
            room.handle_request(request_id, actor_id, decision, Utc::now())
        })?;
        info!(%room_id, %request_id, ?status, "Request decided");
        stored_request(&room, request_id)
    }

    /// Requests the actor sent or is expected to decide
    pub fn list_requests(&self, room_id: Uuid, actor_id: Uuid) -> Result<Vec<Request>> {
        let room = self.get_room(room_id, actor_id)?;
        Ok(room.requests_for(actor_id).into_iter().cloned().collect())
    }

    // === Resolvers ===

    #[instrument(skip(self))]
    pub fn auto_assign(&self, room_id: Uuid, actor_id: Uuid) -> Result<AutoAssignReport> {
        let (_, report) = self.mutate(room_id, |room| room.auto_assign(actor_id, Utc::now()))?;
        info!(
            %room_id,
            assigned = report.assigned_count,
            conflicts = report.conflicts.len(),
            "Auto-assign finished"
        );
        Ok(report)
    }

    /// Smart exchange relative to the current week
    pub fn smart_exchange(
        &self,
        room_id: Uuid,
        requester_id: Uuid,
        target_day: Weekday,
        target_time: Option<ClockTime>,
    ) -> Result<ExchangeOutcome> {
        self.smart_exchange_on(
            room_id,
            requester_id,
            target_day,
            target_time,
            Utc::now().date_naive(),
        )
    }

    #[instrument(skip(self))]
    pub fn smart_exchange_on(
        &self,
        room_id: Uuid,
        requester_id: Uuid,
        target_day: Weekday,
        target_time: Option<ClockTime>,
        today: NaiveDate,
    ) -> Result<ExchangeOutcome> {
        let owner_id = self.load_room(room_id)?.owner_id;
        let owner = self.store.availability_for_user(owner_id)?;
        let requester = self.store.availability_for_user(requester_id)?;
        let prefs = ExchangePreferences {
            owner: &owner,
            requester: &requester,
        };

        let (_, outcome) = self.mutate(room_id, |room| {
            room.smart_exchange(requester_id, target_day, target_time, &prefs, today)
        })?;
        info!(%room_id, %requester_id, ?outcome, "Exchange resolved");
        Ok(outcome)
    }
}

fn stored_request(room: &Room, request_id: Uuid) -> Result<Request> {
    room.request(request_id)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("Request {}", request_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestStatus, SlotStatus};
    use crate::storage::{AvailabilityRepository, Database, RoomRepository, UserRepository};
    use std::cell::Cell;
    use std::path::Path;

    fn scheduler() -> Scheduler<Database> {
        Scheduler::new(Database::open_in_memory().unwrap(), EngineConfig::default())
    }

    fn user(s: &Scheduler<Database>, name: &str) -> Uuid {
        let user = User::new(name.into());
        s.register_user(&user).unwrap();
        user.id
    }

    fn new_room(max_members: u32) -> NewRoom {
        NewRoom {
            name: "Tutoring".into(),
            description: Some("Weekly sessions".into()),
            max_members,
            settings: RoomSettings::default(),
        }
    }

    fn r(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    fn weekly(day: Weekday, start: &str, end: &str) -> SlotSpec {
        SlotSpec::new(DayKey::weekly(day), r(start, end))
    }

    #[test]
    fn test_capacity_counts_members_not_owner() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let room = s.create_room(owner, new_room(2)).unwrap();
        assert_eq!(room.invite_code.len(), 6);

        s.join_room(&room.invite_code, user(&s, "A")).unwrap();
        s.join_room(&room.invite_code.to_lowercase(), user(&s, "B")).unwrap();
        let err = s.join_room(&room.invite_code, user(&s, "C")).unwrap_err();
        assert!(matches!(err, Error::Capacity { max: 2 }));
    }

    #[test]
    fn test_rejoin_keeps_color_and_skips_write() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let room = s.create_room(owner, new_room(3)).unwrap();

        let (joined, outcome) = s.join_room(&room.invite_code, a).unwrap();
        assert_eq!(outcome, JoinOutcome::Joined);
        let (again, outcome) = s.join_room(&room.invite_code, a).unwrap();
        assert_eq!(outcome, JoinOutcome::AlreadyMember);
        assert_eq!(again.version, joined.version);
        assert_eq!(again.member(a).unwrap().color, joined.member(a).unwrap().color);
        assert_ne!(joined.member(a).unwrap().color, s.config().colors.owner_color);
        assert!(matches!(
            s.join_room("NOPE00", a),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_conflict_then_revert_through_service() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let b = user(&s, "B");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();
        s.join_room(&room.invite_code, b).unwrap();

        s.submit_slots(room.id, a, &[weekly(Weekday::Mon, "10:00", "11:00")]).unwrap();
        let views = s
            .submit_slots(room.id, b, &[weekly(Weekday::Mon, "10:30", "11:30")])
            .unwrap();
        assert!(views.iter().all(|v| v.slot.status == SlotStatus::Conflict));
        assert!(views.iter().any(|v| v.user_name == "A"));

        let b_slot = views.iter().find(|v| v.slot.user_id == b).unwrap().slot.id;
        let views = s.delete_slot(room.id, owner, b_slot).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].slot.status, SlotStatus::Confirmed);
        assert!(views[0].color.is_some());
    }

    #[test]
    fn test_request_lifecycle_through_service() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();

        let request = s
            .create_request(
                room.id,
                a,
                RequestPayload::TimeRequest {
                    slot: weekly(Weekday::Tue, "09:00", "10:00"),
                },
                Some("Tuesday mornings".into()),
            )
            .unwrap();
        assert_eq!(s.list_requests(room.id, owner).unwrap().len(), 1);

        assert!(matches!(
            s.handle_request(request.id, a, Decision::Approve),
            Err(Error::PermissionDenied(_))
        ));
        let decided = s.handle_request(request.id, owner, Decision::Approve).unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(s.list_slots(room.id, a).unwrap().len(), 1);

        assert!(matches!(
            s.handle_request(Uuid::new_v4(), owner, Decision::Approve),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_auto_assign_through_service() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();

        assert!(matches!(s.auto_assign(room.id, owner), Err(Error::NoWork(_))));
        s.create_request(
            room.id,
            a,
            RequestPayload::TimeRequest {
                slot: weekly(Weekday::Thu, "15:00", "16:00"),
            },
            None,
        )
        .unwrap();
        let report = s.auto_assign(room.id, owner).unwrap();
        assert_eq!(report.assigned_count, 1);
        assert!(report.conflicts.is_empty());
    }

    #[test]
    fn test_remove_member_cascades() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();
        s.submit_slots(room.id, a, &[weekly(Weekday::Mon, "10:00", "11:00")]).unwrap();
        s.create_request(
            room.id,
            a,
            RequestPayload::TimeRequest {
                slot: weekly(Weekday::Tue, "10:00", "11:00"),
            },
            None,
        )
        .unwrap();

        assert!(matches!(
            s.remove_member(room.id, owner, owner),
            Err(Error::SelfRemoval)
        ));
        s.remove_member(room.id, owner, a).unwrap();
        let room = s.get_room(room.id, owner).unwrap();
        assert!(room.time_slots.is_empty());
        assert!(room.requests.is_empty());
        assert!(matches!(s.get_room(room.id, a), Err(Error::PermissionDenied(_))));
    }

    #[test]
    fn test_update_list_and_delete_room() {
        let s = scheduler();
        let owner = user(&s, "Owner");
        let a = user(&s, "A");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();

        let changes = RoomUpdate {
            name: Some("Evening Tutoring".into()),
            ..RoomUpdate::default()
        };
        assert!(matches!(
            s.update_room(room.id, a, changes.clone()),
            Err(Error::PermissionDenied(_))
        ));
        let updated = s.update_room(room.id, owner, changes).unwrap();
        assert_eq!(updated.name, "Evening Tutoring");
        assert!(updated.version > room.version);

        assert_eq!(s.list_rooms(a).unwrap().len(), 1);
        assert!(matches!(s.delete_room(room.id, a), Err(Error::PermissionDenied(_))));
        s.delete_room(room.id, owner).unwrap();
        assert!(matches!(s.get_room(room.id, owner), Err(Error::NotFound(_))));
        assert!(s.list_rooms(owner).unwrap().is_empty());
    }

    /// Lets another room grab the invite code just before the first insert
    struct RacingStore {
        db: Database,
        raced: Cell<bool>,
    }

    impl UserRepository for RacingStore {
        fn upsert_user(&self, user: &User) -> Result<()> {
            self.db.upsert_user(user)
        }
        fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
            self.db.find_user_by_id(id)
        }
    }

    impl RoomRepository for RacingStore {
        fn create_room(&self, room: &Room) -> Result<()> {
            if !self.raced.replace(true) {
                let rival = Room::new(
                    "Rival".into(),
                    Uuid::new_v4(),
                    room.invite_code.clone(),
                    1,
                    "#6B7280".into(),
                )?;
                self.db.create_room(&rival)?;
            }
            self.db.create_room(room)
        }
        fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>> {
            self.db.find_room_by_id(id)
        }
        fn find_room_by_invite_code(&self, code: &str) -> Result<Option<Room>> {
            self.db.find_room_by_invite_code(code)
        }
        fn invite_code_exists(&self, code: &str) -> Result<bool> {
            self.db.invite_code_exists(code)
        }
        fn save_room_if_version(&self, room: &Room, expected: u64) -> Result<bool> {
            self.db.save_room_if_version(room, expected)
        }
        fn delete_room(&self, room_id: Uuid) -> Result<bool> {
            self.db.delete_room(room_id)
        }
        fn list_rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>> {
            self.db.list_rooms_for_user(user_id)
        }
        fn find_room_id_by_request(&self, request_id: Uuid) -> Result<Option<Uuid>> {
            self.db.find_room_id_by_request(request_id)
        }
    }

    impl AvailabilityRepository for RacingStore {
        fn availability_for_user(&self, user_id: Uuid) -> Result<Vec<AvailabilityEntry>> {
            self.db.availability_for_user(user_id)
        }
        fn replace_availability(&self, user_id: Uuid, entries: &[AvailabilityEntry]) -> Result<()> {
            self.db.replace_availability(user_id, entries)
        }
    }

    #[test]
    fn test_create_room_redraws_code_taken_concurrently() {
        let store = RacingStore {
            db: Database::open_in_memory().unwrap(),
            raced: Cell::new(false),
        };
        let s = Scheduler::new(store, EngineConfig::default());
        let owner = Uuid::new_v4();

        let room = s.create_room(owner, new_room(3)).unwrap();
        assert!(s.store().raced.get());
        let owned = s.store().db.list_rooms_for_user(owner).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].invite_code, room.invite_code);
        assert_eq!(s.get_room(room.id, owner).unwrap().name, "Tutoring");
    }

    /// Owner prefers Wednesday 13-17, requester Wednesday 09-15
    fn exchange_room(s: &Scheduler<Database>) -> (Room, Uuid, Uuid, Uuid) {
        let owner = user(s, "Owner");
        let a = user(s, "A");
        let b = user(s, "B");
        let room = s.create_room(owner, new_room(3)).unwrap();
        s.join_room(&room.invite_code, a).unwrap();
        s.join_room(&room.invite_code, b).unwrap();
        s.set_availability(owner, &[AvailabilityEntry::weekly(Weekday::Wed, r("13:00", "17:00"))])
            .unwrap();
        s.set_availability(a, &[AvailabilityEntry::weekly(Weekday::Wed, r("09:00", "15:00"))])
            .unwrap();
        s.assign_slot(room.id, owner, a, &weekly(Weekday::Mon, "10:00", "11:00"))
            .unwrap();
        (room, owner, a, b)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_exchange_moves_to_first_shared_window() {
        let s = scheduler();
        let (room, owner, a, _) = exchange_room(&s);

        let outcome = s
            .smart_exchange_on(room.id, a, Weekday::Wed, None, today())
            .unwrap();
        assert!(matches!(
            outcome,
            ExchangeOutcome::Moved { range, .. } if range == r("13:00", "14:00")
        ));

        let slots = s.list_slots(room.id, owner).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].slot.day, DayKey::weekly(Weekday::Wed));
    }

    #[test]
    fn test_exchange_to_unpreferred_day_leaves_room_untouched() {
        let s = scheduler();
        let (room, owner, a, _) = exchange_room(&s);
        let before = s.get_room(room.id, owner).unwrap();

        assert!(matches!(
            s.smart_exchange_on(room.id, a, Weekday::Sat, None, today()),
            Err(Error::NotPreferred(_))
        ));
        assert_eq!(s.get_room(room.id, owner).unwrap(), before);
    }

    #[test]
    fn test_exchange_escalation_and_approval() {
        let s = scheduler();
        let (room, owner, a, b) = exchange_room(&s);
        s.submit_slots(room.id, b, &[weekly(Weekday::Wed, "13:00", "14:00")])
            .unwrap();

        let request_id = match s
            .smart_exchange_on(room.id, a, Weekday::Wed, None, today())
            .unwrap()
        {
            ExchangeOutcome::NeedsApproval {
                occupied_by,
                request_id,
            } => {
                assert_eq!(occupied_by, b);
                request_id
            }
            other => panic!("expected escalation, got {:?}", other),
        };
        assert_eq!(s.list_requests(room.id, b).unwrap().len(), 1);

        s.handle_request(request_id, b, Decision::Approve).unwrap();
        let room = s.get_room(room.id, owner).unwrap();
        let wednesday = room
            .time_slots
            .iter()
            .find(|slot| slot.day.weekday == Weekday::Wed)
            .unwrap();
        let monday = room
            .time_slots
            .iter()
            .find(|slot| slot.day.weekday == Weekday::Mon)
            .unwrap();
        assert_eq!(wednesday.user_id, a);
        assert_eq!(monday.user_id, b);
    }

    fn shared_scheduler(path: &Path) -> Scheduler<Database> {
        let config = EngineConfig::default();
        let db = Database::open_with_config(path, &config.storage).unwrap();
        Scheduler::new(db, config)
    }

    #[test]
    fn test_concurrent_joins_respect_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.db");

        let s = shared_scheduler(&path);
        let owner = Uuid::new_v4();
        let room = s.create_room(owner, new_room(1)).unwrap();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let path = path.clone();
                let code = room.invite_code.clone();
                std::thread::spawn(move || {
                    let s = shared_scheduler(&path);
                    s.join_room(&code, Uuid::new_v4()).map(|(_, outcome)| outcome)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let joined = results.iter().filter(|r| r.is_ok()).count();
        let full = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Capacity { .. })))
            .count();
        assert_eq!((joined, full), (1, 1));

        let stored = s.get_room(room.id, owner).unwrap();
        assert_eq!(stored.member_count(), 1);
    }

    #[test]
    fn test_concurrent_joins_of_same_user_never_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.db");

        let s = shared_scheduler(&path);
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let room = s.create_room(owner, new_room(5)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let path = path.clone();
                let code = room.invite_code.clone();
                std::thread::spawn(move || shared_scheduler(&path).join_room(&code, member).is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let stored = s.get_room(room.id, owner).unwrap();
        assert_eq!(stored.members.iter().filter(|m| m.user_id == member).count(), 1);
    }
}
