//! Ledger commands

use clap::Subcommand;
use roomgrid_core::SlotSpec;
use uuid::Uuid;

use crate::args::parse_slot;
use crate::context::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum SlotAction {
    /// Add slots as 'DAY HH:MM-HH:MM'; no --slot clears all of yours
    Submit {
        room: Uuid,
        #[arg(long = "slot", value_parser = parse_slot)]
        slots: Vec<SlotSpec>,
        /// Priority stamped on every submitted slot
        #[arg(long, default_value_t = 0)]
        priority: u8,
    },
    /// Remove one of your slots
    Remove {
        room: Uuid,
        #[arg(long, value_parser = parse_slot)]
        slot: SlotSpec,
    },
    /// Assign a slot to a member (owner only)
    Assign {
        room: Uuid,
        #[arg(long)]
        to: Uuid,
        #[arg(long, value_parser = parse_slot)]
        slot: SlotSpec,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, default_value_t = 0)]
        priority: u8,
    },
    /// Delete any slot by ID (owner only)
    Delete { room: Uuid, slot_id: Uuid },
    /// Show the ledger
    List { room: Uuid },
}

pub fn run(ctx: &Context, action: SlotAction) -> CliResult {
    let scheduler = &ctx.scheduler;
    let actor = ctx.actor()?;

    let views = match action {
        SlotAction::Submit {
            room,
            slots,
            priority,
        } => {
            let slots: Vec<_> = slots.into_iter().map(|s| s.with_priority(priority)).collect();
            scheduler.submit_slots(room, actor, &slots)?
        }
        SlotAction::Remove { room, slot } => {
            scheduler.remove_slot(room, actor, slot.day, slot.range)?
        }
        SlotAction::Assign {
            room,
            to,
            slot,
            subject,
            priority,
        } => {
            let slot = match subject {
                Some(subject) => slot.with_subject(subject),
                None => slot,
            }
            .with_priority(priority);
            scheduler.assign_slot(room, actor, to, &slot)?
        }
        SlotAction::Delete { room, slot_id } => scheduler.delete_slot(room, actor, slot_id)?,
        SlotAction::List { room } => scheduler.list_slots(room, actor)?,
    };
    print_json(&views)
}
