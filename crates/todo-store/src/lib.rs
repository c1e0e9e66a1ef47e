//! # todo-store
//!
//! Task and category persistence with `SQLite`.
//!
//! - [`model`] — `Task`, `Category`, drafts, `Priority`, `RecordState`
//! - [`db`] — `r2d2` connection pool with per-connection pragmas
//! - [`migrations`] — embedded, versioned schema migrations
//! - [`repository`] — generic [`Repository`] plus task/category queries
//!
//! Deletion is always soft: rows are flagged `is_deleted = 1` and hidden
//! from every repository read.

#![deny(unsafe_code)]

pub mod db;
pub mod errors;
pub mod migrations;
pub mod model;
pub mod repository;

pub use db::{ConnectionConfig, ConnectionPool, PooledConnection};
pub use errors::{Result, StoreError};
pub use model::{
    Category, CategoryDraft, CategoryWithCounts, Priority, RecordState, Task, TaskDraft,
};
pub use repository::{
    CategoryQueries, Criteria, Entity, Repository, SqliteRepository, TaskFilter, TaskListResult,
    TaskQueries, TaskStatistics,
};
