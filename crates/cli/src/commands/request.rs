//! Negotiation commands

use clap::{Subcommand, ValueEnum};
use roomgrid_core::{Decision, RequestPayload, SlotSpec};
use uuid::Uuid;

use crate::args::parse_slot;
use crate::context::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum RequestAction {
    /// Ask the owner for a new slot
    Time {
        room: Uuid,
        #[arg(long, value_parser = parse_slot)]
        slot: SlotSpec,
        #[arg(long)]
        message: Option<String>,
    },
    /// Ask the owner to move one of your slots
    Change {
        room: Uuid,
        #[arg(long, value_parser = parse_slot)]
        from: SlotSpec,
        #[arg(long, value_parser = parse_slot)]
        to: SlotSpec,
        #[arg(long)]
        message: Option<String>,
    },
    /// Ask the owner to release one of your slots
    Release {
        room: Uuid,
        #[arg(long, value_parser = parse_slot)]
        slot: SlotSpec,
        #[arg(long)]
        message: Option<String>,
    },
    /// Ask another member for their slot
    Swap {
        room: Uuid,
        #[arg(long, value_parser = parse_slot)]
        slot: SlotSpec,
        /// Member currently holding the slot
        #[arg(long)]
        with: Uuid,
        #[arg(long)]
        message: Option<String>,
    },
    /// Approve or reject a pending request
    Handle {
        request: Uuid,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Requests you sent or have to decide
    List { room: Uuid },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Reject,
}

impl From<DecisionArg> for Decision {
    fn from(value: DecisionArg) -> Self {
        match value {
            DecisionArg::Approve => Decision::Approve,
            DecisionArg::Reject => Decision::Reject,
        }
    }
}

pub fn run(ctx: &Context, action: RequestAction) -> CliResult {
    let scheduler = &ctx.scheduler;
    let actor = ctx.actor()?;

    let (room, payload, message) = match action {
        RequestAction::Handle { request, decision } => {
            let request = scheduler.handle_request(request, actor, decision.into())?;
            return print_json(&request);
        }
        RequestAction::List { room } => {
            return print_json(&scheduler.list_requests(room, actor)?);
        }
        RequestAction::Time {
            room,
            slot,
            message,
        } => (room, RequestPayload::TimeRequest { slot }, message),
        RequestAction::Change {
            room,
            from,
            to,
            message,
        } => (room, RequestPayload::TimeChange { from, to }, message),
        RequestAction::Release {
            room,
            slot,
            message,
        } => (room, RequestPayload::SlotRelease { slot }, message),
        RequestAction::Swap {
            room,
            slot,
            with,
            message,
        } => (
            room,
            RequestPayload::SlotSwap {
                slot,
                target_user_id: with,
            },
            message,
        ),
    };

    let request = scheduler.create_request(room, actor, payload, message)?;
    print_json(&request)
}
