//! Task storage: row codec plus relationship-aware queries.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{state_from_row, Criteria, Entity, Repository, SqlTimestamp, SqliteRepository};
use crate::errors::Result;
use crate::model::{Category, Priority, RecordState, Task, TaskDraft, TaskRow};

/// Default ordering for task lists: soonest due first, undated last.
const DUE_DATE_ORDER: &str = "due_date IS NULL, due_date, id";

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Filter for [`TaskQueries::list_tasks`]. Unset fields do not constrain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskFilter {
    /// Case-insensitive substring of title or description.
    pub search: Option<String>,
    /// Only tasks in this category.
    pub category_id: Option<i64>,
    /// Only tasks with this priority.
    pub priority: Option<Priority>,
    /// Only completed (`true`) or pending (`false`) tasks.
    pub is_completed: Option<bool>,
}

/// One page of tasks plus the unpaginated match count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResult {
    /// Tasks on this page.
    pub tasks: Vec<Task>,
    /// Total number of matching tasks.
    pub total: u32,
}

/// Counters over all live tasks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    /// Live tasks.
    pub total: u32,
    /// Completed tasks.
    pub completed: u32,
    /// Tasks not yet completed.
    pub pending: u32,
    /// Pending tasks past their due date.
    pub overdue: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Task queries
// ─────────────────────────────────────────────────────────────────────────────

/// Task-specific reads on top of [`Repository`].
pub trait TaskQueries {
    /// Live tasks in a category, category loaded.
    fn get_tasks_by_category(&self, category_id: i64) -> Result<Vec<Task>>;

    /// Live tasks with the given priority.
    fn get_tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>>;

    /// Live tasks that are completed (`true`) or pending (`false`).
    fn get_tasks_by_completion(&self, completed: bool) -> Result<Vec<Task>>;

    /// Live pending tasks due strictly before `now`.
    fn get_overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>>;

    /// Filtered, paginated listing ordered by due date (undated last).
    fn list_tasks(&self, filter: &TaskFilter, limit: u32, offset: u32) -> Result<TaskListResult>;

    /// Totals across live tasks, with overdue measured against `now`.
    fn statistics(&self, now: DateTime<Utc>) -> Result<TaskStatistics>;

    /// Number of live tasks referencing a category.
    fn count_active_by_category(&self, category_id: i64) -> Result<u32>;
}

impl TaskQueries for SqliteRepository<'_, Task> {
    fn get_tasks_by_category(&self, category_id: i64) -> Result<Vec<Task>> {
        self.find(&Criteria::new().eq("category_id", category_id))
    }

    fn get_tasks_by_priority(&self, priority: Priority) -> Result<Vec<Task>> {
        self.find(&Criteria::new().eq("priority", priority.as_sql()))
    }

    fn get_tasks_by_completion(&self, completed: bool) -> Result<Vec<Task>> {
        self.find(&Criteria::new().eq("is_completed", completed))
    }

    fn get_overdue_tasks(&self, now: DateTime<Utc>) -> Result<Vec<Task>> {
        self.find(&overdue_criteria(now).order_by(DUE_DATE_ORDER))
    }

    fn list_tasks(&self, filter: &TaskFilter, limit: u32, offset: u32) -> Result<TaskListResult> {
        let criteria = filter_criteria(filter);
        let total = self.count(&criteria)?;
        let tasks = self.find(&criteria.order_by(DUE_DATE_ORDER).limit(limit).offset(offset))?;
        Ok(TaskListResult { tasks, total })
    }

    fn statistics(&self, now: DateTime<Utc>) -> Result<TaskStatistics> {
        let total = self.count(&Criteria::new())?;
        let completed = self.count(&Criteria::new().eq("is_completed", true))?;
        let overdue = self.count(&overdue_criteria(now))?;
        Ok(TaskStatistics {
            total,
            completed,
            pending: total.saturating_sub(completed),
            overdue,
        })
    }

    fn count_active_by_category(&self, category_id: i64) -> Result<u32> {
        self.count(&Criteria::new().eq("category_id", category_id))
    }
}

fn overdue_criteria(now: DateTime<Utc>) -> Criteria {
    Criteria::new().condition(
        "is_completed = 0 AND due_date IS NOT NULL AND due_date < ?",
        [Value::from(SqlTimestamp::format(now))],
    )
}

fn filter_criteria(filter: &TaskFilter) -> Criteria {
    let mut criteria = Criteria::new();

    if let Some(category_id) = filter.category_id {
        criteria = criteria.eq("category_id", category_id);
    }
    if let Some(priority) = filter.priority {
        criteria = criteria.eq("priority", priority.as_sql());
    }
    if let Some(completed) = filter.is_completed {
        criteria = criteria.eq("is_completed", completed);
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        criteria = criteria.condition(
            "(title LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')",
            [Value::from(pattern.clone()), Value::from(pattern)],
        );
    }

    criteria
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Row codec
// ─────────────────────────────────────────────────────────────────────────────

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_sql()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = i64::column_result(value)?;
        Self::from_sql(raw).ok_or(FromSqlError::OutOfRange(raw))
    }
}

struct SqlUuid(Uuid);

impl FromSql for SqlUuid {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Uuid::parse_str(value.as_str()?)
            .map(Self)
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl Entity for Task {
    const TABLE: &'static str = "tasks";
    const KIND: &'static str = "Task";

    fn id(&self) -> i64 {
        Task::id(self)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let uuid: SqlUuid = row.get("uuid")?;
        let due_date: Option<SqlTimestamp> = row.get("due_date")?;
        let completed_at: Option<SqlTimestamp> = row.get("completed_at")?;
        let created_at: SqlTimestamp = row.get("created_at")?;
        let modified_at: SqlTimestamp = row.get("modified_at")?;

        Ok(Task::from_row_parts(TaskRow {
            id: row.get("id")?,
            uuid: uuid.0,
            draft: TaskDraft {
                title: row.get("title")?,
                description: row.get("description")?,
                due_date: due_date.map(|ts| ts.0),
                priority: row.get("priority")?,
                category_id: row.get("category_id")?,
            },
            completed_at: completed_at.map(|ts| ts.0),
            created_at: created_at.0,
            modified_at: modified_at.0,
            state: state_from_row(row)?,
        }))
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let _ = conn.execute(
            "INSERT INTO tasks (uuid, title, description, due_date, priority,
             is_completed, completed_at, category_id, created_at, modified_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                self.uuid().to_string(),
                self.title,
                self.description,
                self.due_date.map(SqlTimestamp),
                self.priority,
                self.is_completed(),
                self.completed_at().map(SqlTimestamp),
                self.category_id,
                SqlTimestamp(self.created_at()),
                SqlTimestamp(self.modified_at()),
                self.state().is_deleted(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn write(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, due_date = ?3, priority = ?4,
             is_completed = ?5, completed_at = ?6, category_id = ?7, modified_at = ?8,
             is_deleted = ?9
             WHERE id = ?10",
            params![
                self.title,
                self.description,
                self.due_date.map(SqlTimestamp),
                self.priority,
                self.is_completed(),
                self.completed_at().map(SqlTimestamp),
                self.category_id,
                SqlTimestamp(self.modified_at()),
                self.state().is_deleted(),
                Task::id(self),
            ],
        )
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.set_modified_at(at);
    }

    fn mark_deleted(&mut self) {
        self.set_state(RecordState::Deleted);
    }

    fn load_related(conn: &Connection, items: &mut [Self]) -> Result<()> {
        let mut ids: Vec<i64> = items.iter().filter_map(|t| t.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let criteria = Criteria::new().condition(
            format!("id IN ({placeholders})"),
            ids.into_iter().map(Value::from),
        );
        let categories: HashMap<i64, Category> = SqliteRepository::<Category>::new(conn)
            .find(&criteria)?
            .into_iter()
            .map(|c| (c.id(), c))
            .collect();

        for task in items {
            task.category = task.category_id.and_then(|id| categories.get(&id).cloned());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
