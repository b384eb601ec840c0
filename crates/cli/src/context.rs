//! Process-level setup: data directory, config file, acting user

use std::error::Error;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use roomgrid_core::{Database, EngineConfig, Scheduler};
use serde::Serialize;
use uuid::Uuid;

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

pub struct Context {
    pub scheduler: Scheduler<Database>,
    actor: Option<Uuid>,
}

impl Context {
    pub fn open(db: Option<PathBuf>, config: Option<PathBuf>, actor: Option<Uuid>) -> CliResult<Self> {
        let dirs = ProjectDirs::from("dev", "roomgrid", "roomgrid");

        let config = match config {
            Some(path) => EngineConfig::load(&path)?,
            None => match dirs.as_ref().map(|d| d.config_dir().join("roomgrid.toml")) {
                Some(path) if path.exists() => EngineConfig::load(&path)?,
                _ => EngineConfig::default(),
            },
        };

        let db_path = match db {
            Some(path) => path,
            None => dirs
                .as_ref()
                .map(|d| d.data_dir().join("roomgrid.db"))
                .ok_or("Could not determine data directory; pass --db")?,
        };
        ensure_parent(&db_path)?;

        let database = Database::open_with_config(&db_path, &config.storage)?;
        tracing::debug!(path = %db_path.display(), "Opened database");

        Ok(Self {
            scheduler: Scheduler::new(database, config),
            actor,
        })
    }

    /// The `--as` user
    pub fn actor(&self) -> CliResult<Uuid> {
        self.actor
            .ok_or_else(|| "this command needs --as <USER_ID>".into())
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
