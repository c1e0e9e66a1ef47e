//! Task lifecycle: create, edit, complete, soft-delete, and filtered reads.
//!
//! Business rules enforced here on top of the repository:
//!
//! - **Validation first**: drafts and ids are checked before any storage
//!   call, so invalid input never touches the database.
//! - **Live category**: a task may only point at an existing, non-deleted
//!   category.
//! - **Identity is fixed**: updates copy the editable fields onto the stored
//!   task; id, uuid, creation time and completion state are never taken from
//!   the caller.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, instrument};

use todo_store::model;
use todo_store::{
    Category, PooledConnection, Priority, Repository, SqliteRepository, Task, TaskDraft,
    TaskFilter, TaskQueries, TaskStatistics,
};

use crate::database::Database;
use crate::errors::{Result, TodoError};
use crate::events::{ChangeEvent, ChangeKind, ChangeNotifier, EntityKind};
use crate::validation::{validate_id, validate_task};

/// Largest page [`TaskService::list_tasks`] will return.
pub const MAX_PAGE_SIZE: u32 = 200;

/// One page of a filtered task listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPage {
    /// Tasks on this page.
    pub tasks: Vec<Task>,
    /// Matching tasks across all pages.
    pub total: u32,
    /// 1-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Number of pages at this size.
    pub total_pages: u32,
}

/// Task operations over a shared [`Database`].
#[derive(Clone, Debug)]
pub struct TaskService {
    db: Database,
    notifier: ChangeNotifier,
}

impl TaskService {
    /// Create a service publishing changes on `notifier`.
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// Receive change events for tasks (and everything else on the notifier).
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Validate and store a new pending task.
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_task(&self, draft: TaskDraft) -> Result<Task> {
        validate_task(&draft, today())?;

        let task = self
            .db
            .run(move |conn| {
                ensure_live_category(conn, draft.category_id)?;
                let repo = SqliteRepository::<Task>::new(conn);
                Ok(repo.add(&Task::from_draft(draft, model::now()))?)
            })
            .await?;

        info!(id = task.id(), "task created");
        self.notifier
            .publish(EntityKind::Task, task.id(), ChangeKind::Created);
        Ok(task)
    }

    /// Copy the editable fields of `task` onto the stored task with the same id.
    #[instrument(skip(self, task), fields(id = task.id()))]
    pub async fn update_task(&self, task: &Task) -> Result<Task> {
        let id = task.id();
        validate_id("id", id)?;
        let draft = task.draft();
        validate_task(&draft, today())?;

        let updated = self
            .db
            .run(move |conn| {
                let repo = SqliteRepository::<Task>::new(conn);
                let mut existing = repo
                    .get_by_id(id)?
                    .ok_or_else(|| TodoError::task_not_found(id))?;
                ensure_live_category(conn, draft.category_id)?;
                existing.apply(draft);
                repo.update(&mut existing)?;
                repo.get_by_id(id)?
                    .ok_or_else(|| TodoError::task_not_found(id))
            })
            .await?;

        info!(id, "task updated");
        self.notifier.publish(EntityKind::Task, id, ChangeKind::Updated);
        Ok(updated)
    }

    /// Soft-delete a live task.
    #[instrument(skip(self))]
    pub async fn delete_task(&self, id: i64) -> Result<()> {
        validate_id("id", id)?;

        let deleted = self
            .db
            .run(move |conn| Ok(SqliteRepository::<Task>::new(conn).delete(id)?))
            .await?;
        if !deleted {
            return Err(TodoError::task_not_found(id));
        }

        info!(id, "task deleted");
        self.notifier.publish(EntityKind::Task, id, ChangeKind::Deleted);
        Ok(())
    }

    /// Flip a task between pending and completed. Returns the stored result.
    #[instrument(skip(self))]
    pub async fn toggle_task_completion(&self, id: i64) -> Result<Task> {
        validate_id("id", id)?;

        let task = self
            .db
            .run(move |conn| {
                let repo = SqliteRepository::<Task>::new(conn);
                let mut task = repo
                    .get_by_id(id)?
                    .ok_or_else(|| TodoError::task_not_found(id))?;
                let completed = !task.is_completed();
                task.set_completed(completed, model::now());
                repo.update(&mut task)?;
                Ok(task)
            })
            .await?;

        info!(id, completed = task.is_completed(), "task completion toggled");
        self.notifier
            .publish(EntityKind::Task, id, ChangeKind::CompletionToggled);
        Ok(task)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// Live task by id, `None` if there is none.
    #[instrument(skip(self))]
    pub async fn get_task_by_id(&self, id: i64) -> Result<Option<Task>> {
        validate_id("id", id)?;
        self.db
            .run(move |conn| Ok(SqliteRepository::<Task>::new(conn).get_by_id(id)?))
            .await
    }

    /// Every live task.
    pub async fn get_all_tasks(&self) -> Result<Vec<Task>> {
        self.db
            .run(|conn| Ok(SqliteRepository::<Task>::new(conn).get_all()?))
            .await
    }

    /// Live tasks with the given priority.
    pub async fn get_tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>> {
        self.db
            .run(move |conn| {
                Ok(SqliteRepository::<Task>::new(conn).get_tasks_by_priority(priority)?)
            })
            .await
    }

    /// Pending tasks whose due date has passed.
    pub async fn get_overdue_tasks(&self) -> Result<Vec<Task>> {
        let now = model::now();
        self.db
            .run(move |conn| Ok(SqliteRepository::<Task>::new(conn).get_overdue_tasks(now)?))
            .await
    }

    /// Completed tasks.
    pub async fn get_completed_tasks(&self) -> Result<Vec<Task>> {
        self.by_completion(true).await
    }

    /// Tasks not yet completed.
    pub async fn get_pending_tasks(&self) -> Result<Vec<Task>> {
        self.by_completion(false).await
    }

    /// Live tasks in a category, with the category loaded.
    #[instrument(skip(self))]
    pub async fn get_tasks_by_category(&self, category_id: i64) -> Result<Vec<Task>> {
        validate_id("categoryId", category_id)?;
        self.db
            .run(move |conn| {
                Ok(SqliteRepository::<Task>::new(conn).get_tasks_by_category(category_id)?)
            })
            .await
    }

    /// Filtered listing, one 1-based page at a time.
    #[instrument(skip(self, filter))]
    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: u32,
        page_size: u32,
    ) -> Result<TaskPage> {
        if page == 0 {
            return Err(TodoError::validation("page", "must be at least 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(TodoError::validation(
                "pageSize",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }
        if let Some(category_id) = filter.category_id {
            validate_id("categoryId", category_id)?;
        }

        let filter = filter.clone();
        let offset = (page - 1).saturating_mul(page_size);
        let result = self
            .db
            .run(move |conn| {
                Ok(SqliteRepository::<Task>::new(conn).list_tasks(&filter, page_size, offset)?)
            })
            .await?;

        Ok(TaskPage {
            total_pages: result.total.div_ceil(page_size),
            tasks: result.tasks,
            total: result.total,
            page,
            page_size,
        })
    }

    /// Counters over all live tasks.
    pub async fn statistics(&self) -> Result<TaskStatistics> {
        let now = model::now();
        self.db
            .run(move |conn| Ok(SqliteRepository::<Task>::new(conn).statistics(now)?))
            .await
    }

    async fn by_completion(&self, completed: bool) -> Result<Vec<Task>> {
        self.db
            .run(move |conn| {
                Ok(SqliteRepository::<Task>::new(conn).get_tasks_by_completion(completed)?)
            })
            .await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A task may only reference a live category.
fn ensure_live_category(conn: &PooledConnection, category_id: Option<i64>) -> Result<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if SqliteRepository::<Category>::new(conn).exists(id)? {
        Ok(())
    } else {
        Err(TodoError::validation(
            "categoryId",
            format!("category {id} does not exist"),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
