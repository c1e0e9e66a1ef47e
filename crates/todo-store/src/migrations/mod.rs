//! Versioned schema for the task database.
//!
//! Scripts are compiled in with [`include_str!`]. The highest version found
//! in `schema_version` marks where the next run starts; each script and its
//! `schema_version` row commit together.

use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Categories and tasks with soft-delete columns",
    sql: include_str!("v001_schema.sql"),
}];

/// Bring the schema up to [`latest_version`], returning how many scripts ran.
///
/// # Errors
///
/// Returns [`StoreError::Migration`] naming the step that failed.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    run_scripts(conn, MIGRATIONS)
}

/// Highest version recorded in `schema_version`, 0 on a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(failed("read schema_version"))
}

/// Version of the newest compiled-in script.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn run_scripts(conn: &Connection, scripts: &[Migration]) -> Result<u32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(failed("create schema_version"))?;

    let from = current_version(conn)?;
    let pending: Vec<&Migration> = scripts.iter().filter(|m| m.version > from).collect();
    if pending.is_empty() {
        debug!(version = from, "schema up to date");
        return Ok(0);
    }

    for migration in &pending {
        info!(version = migration.version, description = migration.description, "migrating");
        apply(conn, migration)?;
    }
    let applied = u32::try_from(pending.len()).unwrap_or(u32::MAX);
    info!(from, to = current_version(conn)?, applied, "schema migrated");
    Ok(applied)
}

fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    let step = format!("apply v{} ({})", migration.version, migration.description);
    let tx = conn.unchecked_transaction().map_err(failed(&step))?;
    tx.execute_batch(migration.sql).map_err(failed(&step))?;
    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, applied_at, description) \
             VALUES (?1, datetime('now'), ?2)",
            params![migration.version, migration.description],
        )
        .map_err(failed(&step))?;
    tx.commit().map_err(failed(&step))
}

fn failed(step: &str) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |e| StoreError::Migration {
        message: format!("{step}: {e}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
