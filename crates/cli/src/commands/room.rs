//! Room and membership commands

use clap::Subcommand;
use roomgrid_core::{NewRoom, RoomSettings, RoomUpdate, TimeRange};
use serde_json::json;
use uuid::Uuid;

use crate::args::parse_range;
use crate::context::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum RoomAction {
    /// Create a room you own
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Members allowed besides the owner
        #[arg(long, default_value_t = 10)]
        max_members: u32,
        /// Working-hour window as HH:MM-HH:MM
        #[arg(long, value_parser = parse_range)]
        working_hours: Option<TimeRange>,
    },
    /// Join a room by invite code
    Join { code: String },
    /// Show a room
    Show { room: Uuid },
    /// Edit a room you own
    Update {
        room: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        max_members: Option<u32>,
        #[arg(long, value_parser = parse_range)]
        working_hours: Option<TimeRange>,
    },
    /// Delete a room you own
    Delete { room: Uuid },
    /// Rooms you own or belong to
    List,
    /// Remove a member and their slots and requests
    RemoveMember { room: Uuid, member: Uuid },
}

pub fn run(ctx: &Context, action: RoomAction) -> CliResult {
    let scheduler = &ctx.scheduler;
    let actor = ctx.actor()?;

    match action {
        RoomAction::Create {
            name,
            description,
            max_members,
            working_hours,
        } => {
            let room = scheduler.create_room(
                actor,
                NewRoom {
                    name,
                    description,
                    max_members,
                    settings: RoomSettings {
                        working_hours,
                        ..RoomSettings::default()
                    },
                },
            )?;
            print_json(&room)
        }
        RoomAction::Join { code } => {
            let (room, outcome) = scheduler.join_room(&code, actor)?;
            print_json(&json!({ "outcome": outcome, "room": room }))
        }
        RoomAction::Show { room } => print_json(&scheduler.get_room(room, actor)?),
        RoomAction::Update {
            room,
            name,
            description,
            max_members,
            working_hours,
        } => {
            let settings = match working_hours {
                Some(hours) => {
                    let mut settings = scheduler.get_room(room, actor)?.settings;
                    settings.working_hours = Some(hours);
                    Some(settings)
                }
                None => None,
            };
            let changes = RoomUpdate {
                name,
                description,
                max_members,
                settings,
            };
            print_json(&scheduler.update_room(room, actor, changes)?)
        }
        RoomAction::Delete { room } => {
            scheduler.delete_room(room, actor)?;
            print_json(&json!({ "deleted": room }))
        }
        RoomAction::List => print_json(&scheduler.list_rooms(actor)?),
        RoomAction::RemoveMember { room, member } => {
            print_json(&scheduler.remove_member(room, actor, member)?)
        }
    }
}
