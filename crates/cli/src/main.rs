use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod args;
mod commands;
mod context;

use context::Context;

#[derive(Parser)]
#[command(name = "roomgrid", version, about = "Shared weekly time grid")]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Engine configuration TOML
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Act as this user
    #[arg(long = "as", global = true, value_name = "USER_ID")]
    actor: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Known users
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Recurring availability of the acting user
    Availability {
        #[command(subcommand)]
        action: commands::availability::AvailabilityAction,
    },
    /// Rooms and membership
    Room {
        #[command(subcommand)]
        action: commands::room::RoomAction,
    },
    /// The time-slot ledger
    Slot {
        #[command(subcommand)]
        action: commands::slot::SlotAction,
    },
    /// Negotiation requests
    Request {
        #[command(subcommand)]
        action: commands::request::RequestAction,
    },
    /// Approve every pending time request that fits
    AutoAssign {
        /// Room ID
        room: Uuid,
    },
    /// Move your assigned block to another day
    Exchange(commands::resolve::ExchangeArgs),
}

fn main() {
    // Logs go to stderr; stdout carries JSON
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = Context::open(cli.db, cli.config, cli.actor).and_then(|ctx| match cli.command {
        Commands::User { action } => commands::user::run(&ctx, action),
        Commands::Availability { action } => commands::availability::run(&ctx, action),
        Commands::Room { action } => commands::room::run(&ctx, action),
        Commands::Slot { action } => commands::slot::run(&ctx, action),
        Commands::Request { action } => commands::request::run(&ctx, action),
        Commands::AutoAssign { room } => commands::resolve::auto_assign(&ctx, room),
        Commands::Exchange(args) => commands::resolve::exchange(&ctx, args),
    });

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
