//! # todo-services
//!
//! Business layer for tasks and categories: validation, uniqueness rules,
//! guarded deletes, and change notifications over the `todo-store`
//! repositories.
//!
//! Every operation is `async`; storage work runs on tokio's blocking pool
//! via [`Database::run`]. Failures are one of the [`TodoError`] kinds.

#![deny(unsafe_code)]

pub mod category_service;
pub mod database;
pub mod errors;
pub mod events;
pub mod task_service;
pub mod validation;

pub use category_service::CategoryService;
pub use database::Database;
pub use errors::{Result, TodoError};
pub use events::{ChangeEvent, ChangeKind, ChangeNotifier, EntityKind};
pub use task_service::{TaskPage, TaskService};

/// Both services wired to one database and one notifier.
#[derive(Clone, Debug)]
pub struct TodoServices {
    /// Task operations.
    pub tasks: TaskService,
    /// Category operations.
    pub categories: CategoryService,
    notifier: ChangeNotifier,
}

impl TodoServices {
    /// Build the services over `db`.
    pub fn new(db: Database) -> Self {
        let notifier = ChangeNotifier::new();
        Self {
            tasks: TaskService::new(db.clone(), notifier.clone()),
            categories: CategoryService::new(db, notifier.clone()),
            notifier,
        }
    }

    /// Receive change events from both services.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }
}
