//! Service error kinds.
//!
//! Every service call fails with exactly one [`TodoError`]. Input problems
//! are [`TodoError::Validation`], missing live records are
//! [`TodoError::NotFound`], broken business rules are [`TodoError::Conflict`].
//! Storage failures pass through unmodified as [`TodoError::Store`].

use thiserror::Error;
use todo_store::StoreError;

/// Errors returned by the task and category services.
#[derive(Debug, Error)]
pub enum TodoError {
    /// Caller input failed a field constraint.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Offending field, camelCase (e.g. "title", "dueDate").
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// No live entity with this id.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("Task", "Category").
        entity: &'static str,
        /// The id that was looked up.
        id: i64,
    },

    /// A business rule that spans entities was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage layer failure.
    #[error(transparent)]
    Store(StoreError),

    /// Background task failed to complete.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TodoError {
    /// Validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Non-positive id passed as `field`.
    pub fn invalid_id(field: &'static str, id: i64) -> Self {
        Self::validation(field, format!("must be a positive integer, got {id}"))
    }

    /// Task not found.
    pub fn task_not_found(id: i64) -> Self {
        Self::NotFound { entity: "Task", id }
    }

    /// Category not found.
    pub fn category_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "Category",
            id,
        }
    }

    /// Whether this is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this is a not-found failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this is a conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<StoreError> for TodoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            other => Self::Store(other),
        }
    }
}

/// Convenience alias for service results.
pub type Result<T> = std::result::Result<T, TodoError>;
