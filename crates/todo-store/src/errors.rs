//! Error types for the storage layer.
//!
//! [`StoreError`] is returned by every repository, migration, and pool
//! operation. Services convert [`StoreError::NotFound`] into their own
//! not-found kind and pass every other variant through untouched.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },

    /// No row with the given id exists.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g., "Task", "Category").
        entity: &'static str,
        /// The id that was looked up.
        id: i64,
    },
}

impl StoreError {
    /// Create a not-found error for an entity kind.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Whether a UNIQUE index rejected the write.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )
    }
}

/// Convenience type alias for storage results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
