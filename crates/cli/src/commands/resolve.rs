//! Auto-assign and smart exchange

use chrono::Weekday;
use clap::Args;
use roomgrid_core::ClockTime;
use uuid::Uuid;

use crate::context::{print_json, CliResult, Context};

#[derive(Args)]
pub struct ExchangeArgs {
    /// Room ID
    pub room: Uuid,
    /// Destination weekday
    #[arg(long)]
    pub day: Weekday,
    /// Start time; defaults to the first shared window
    #[arg(long)]
    pub time: Option<ClockTime>,
}

pub fn auto_assign(ctx: &Context, room: Uuid) -> CliResult {
    let report = ctx.scheduler.auto_assign(room, ctx.actor()?)?;
    print_json(&report)
}

pub fn exchange(ctx: &Context, args: ExchangeArgs) -> CliResult {
    let outcome = ctx
        .scheduler
        .smart_exchange(args.room, ctx.actor()?, args.day, args.time)?;
    print_json(&outcome)
}
