//! User commands

use clap::Subcommand;
use roomgrid_core::User;
use uuid::Uuid;

use crate::context::{print_json, CliResult, Context};

#[derive(Subcommand)]
pub enum UserAction {
    /// Register a user (or rename an existing one)
    Add {
        /// Display name
        name: String,
        /// Use this ID instead of a fresh one
        #[arg(long)]
        id: Option<Uuid>,
    },
}

pub fn run(ctx: &Context, action: UserAction) -> CliResult {
    match action {
        UserAction::Add { name, id } => {
            let user = match id {
                Some(id) => User::with_id(id, name),
                None => User::new(name),
            };
            ctx.scheduler.register_user(&user)?;
            print_json(&user)
        }
    }
}
