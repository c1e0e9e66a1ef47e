//! # todo
//!
//! Command-line front-end for the task and category manager. Wires
//! settings, logging, the `SQLite` store and the services together, runs one
//! command and prints its result.

#![deny(unsafe_code)]

mod cli;
mod commands;
mod logging;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use todo_services::{Database, TodoServices};
use todo_settings::TodoSettings;
use todo_store::ConnectionConfig;
use tracing::{debug, warn};

use crate::cli::{Cli, Command};

fn open_services(db_path: &Path, settings: &TodoSettings) -> Result<TodoServices> {
    let config = ConnectionConfig {
        pool_size: settings.database.pool_size,
        busy_timeout_ms: settings.database.busy_timeout_ms,
        ..ConnectionConfig::default()
    };
    let db = Database::open(db_path, &config)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    Ok(TodoServices::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        db_path,
        log_level,
        json,
        command,
    } = Cli::parse();

    // Unreadable settings fall back to defaults.
    let settings_path = todo_settings::settings_path();
    let (settings, load_error) = match todo_settings::load_settings_from_path(&settings_path) {
        Ok(settings) => (settings, None),
        Err(e) => (TodoSettings::default(), Some(e)),
    };

    let level = log_level.unwrap_or(settings.logging.level);
    logging::init_subscriber(level.as_filter_str());
    if let Some(e) = load_error {
        warn!(
            path = %settings_path.display(),
            error = %e,
            "failed to load settings, using defaults"
        );
    }

    let report = match command {
        Command::Settings(cmd) => commands::run_settings(cmd, &settings_path, &settings)?,
        Command::Task(cmd) => {
            let services = open_services(&resolve_db_path(db_path, &settings), &settings)?;
            commands::run_task(&services, cmd).await?
        }
        Command::Category(cmd) => {
            let services = open_services(&resolve_db_path(db_path, &settings), &settings)?;
            commands::run_category(&services, cmd).await?
        }
    };

    println!("{}", report.render(json)?);
    Ok(())
}

fn resolve_db_path(cli_path: Option<PathBuf>, settings: &TodoSettings) -> PathBuf {
    let path = cli_path.unwrap_or_else(|| settings.database.resolved_path());
    debug!(path = %path.display(), "database path");
    path
}
