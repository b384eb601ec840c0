//! Recurring availability commands

use clap::Subcommand;
use roomgrid_core::{AvailabilityEntry, AvailabilityRepository, SlotSpec};
use uuid::Uuid;

use crate::args::parse_slot;
use crate::context::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum AvailabilityAction {
    /// Replace your availability windows
    Set {
        /// Window as 'DAY HH:MM-HH:MM'; a date instead of a weekday
        /// overrides the weekly pattern for that date
        #[arg(long = "window", value_parser = parse_slot)]
        windows: Vec<SlotSpec>,
    },
    /// Show a user's availability (yours by default)
    Show {
        #[arg(long)]
        user: Option<Uuid>,
    },
}

fn entry_from(spec: &SlotSpec) -> AvailabilityEntry {
    match spec.day.date {
        Some(date) => AvailabilityEntry::on_date(date, spec.range),
        None => AvailabilityEntry::weekly(spec.day.weekday, spec.range),
    }
}

pub fn run(ctx: &Context, action: AvailabilityAction) -> CliResult {
    match action {
        AvailabilityAction::Set { windows } => {
            let user = ctx.actor()?;
            let entries: Vec<_> = windows.iter().map(entry_from).collect();
            ctx.scheduler.set_availability(user, &entries)?;
            print_json(&entries)
        }
        AvailabilityAction::Show { user } => {
            let user = match user {
                Some(user) => user,
                None => ctx.actor()?,
            };
            let entries = ctx.scheduler.store().availability_for_user(user)?;
            print_json(&entries)
        }
    }
}
