//! Async access to the pooled `SQLite` store.
//!
//! Storage calls block, so [`Database::run`] checks a connection out of the
//! pool and executes the closure on tokio's blocking thread pool. Async
//! callers never hold a connection across an `.await`.

use std::path::Path;

use tokio::task;
use tracing::{debug, info};

use todo_store::db::{self, ConnectionConfig, ConnectionPool};
use todo_store::migrations;
use todo_store::PooledConnection;

use crate::errors::{Result, TodoError};

/// Shared handle to the migrated connection pool. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open(path: impl AsRef<Path>, config: &ConnectionConfig) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                TodoError::Internal(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let pool = db::open_file(path, config)?;
        info!(path = %path.display(), "opened database");
        Self::from_pool(pool)
    }

    /// Fresh in-memory database, migrated. Used by tests and throwaway runs.
    pub fn open_in_memory() -> Result<Self> {
        let pool = db::open_in_memory(&ConnectionConfig::default())?;
        Self::from_pool(pool)
    }

    /// Wrap an existing pool, applying any pending migrations.
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        let conn = pool.get().map_err(todo_store::StoreError::from)?;
        let applied = migrations::run_migrations(&conn)?;
        debug!(applied, "schema ready");
        drop(conn);
        Ok(Self { pool })
    }

    /// Run `f` with a pooled connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&PooledConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = pool.get().map_err(todo_store::StoreError::from)?;
            f(&conn)
        })
        .await
        .map_err(|e| TodoError::Internal(format!("storage task failed: {e}")))?
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("max_connections", &self.pool.max_size())
            .finish()
    }
}
