//! Entity types for tasks and categories.
//!
//! Records are only ever produced by the store: callers describe what they
//! want with a [`TaskDraft`] / [`CategoryDraft`], and storage assigns the id.
//! Identity, audit, and completion fields are private so their invariants
//! hold for every value that leaves this crate:
//!
//! - `completed_at` is `Some` iff the task is completed.
//! - `id` and `uuid` never change after the row is stored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default category color.
pub const DEFAULT_CATEGORY_COLOR: &str = "#007ACC";

/// Default category icon.
pub const DEFAULT_CATEGORY_ICON: &str = "FolderOutline";

/// Current UTC time at the precision the store persists (microseconds).
///
/// Using this everywhere keeps in-memory values equal to what a re-read
/// returns.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// ─────────────────────────────────────────────────────────────────────────────
// Enums
// ─────────────────────────────────────────────────────────────────────────────

/// Task priority.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal work.
    #[default]
    Medium,
    /// Should be done soon.
    High,
    /// Drop everything.
    Critical,
}

impl Priority {
    /// All priorities, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Integer stored in the `priority` column.
    pub fn as_sql(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// Decode the `priority` column.
    pub fn from_sql(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Lowercase name, as used in JSON and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown priority '{s}' (expected low, medium, high, critical)"))
    }
}

/// Soft-delete state of a stored record.
///
/// Deleted records stay in the table but are hidden from every default read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
    /// Visible to normal reads.
    #[default]
    Active,
    /// Logically removed.
    Deleted,
}

impl RecordState {
    /// Decode the `is_deleted` column.
    pub fn from_deleted_flag(is_deleted: bool) -> Self {
        if is_deleted { Self::Deleted } else { Self::Active }
    }

    /// Value for the `is_deleted` column.
    pub fn is_deleted(self) -> bool {
        self == Self::Deleted
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// Fields a caller supplies to create or edit a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryDraft {
    /// Display name, unique among live categories.
    pub name: String,
    /// Hex color (`#RRGGBB` or `#RGB`).
    pub color: String,
    /// Icon identifier.
    pub icon: String,
}

impl CategoryDraft {
    /// Draft with the given name and default color/icon.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for CategoryDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
        }
    }
}

/// A stored category.
///
/// Categories do not own their tasks; use the task queries (or
/// [`CategoryWithCounts`]) to reach them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    id: i64,
    /// Display name.
    pub name: String,
    /// Hex color.
    pub color: String,
    /// Icon identifier.
    pub icon: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    state: RecordState,
}

impl Category {
    /// Build an unsaved category from a draft. Storage assigns the id.
    pub fn from_draft(draft: CategoryDraft, at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            name: draft.name,
            color: draft.color,
            icon: draft.icon,
            created_at: at,
            modified_at: at,
            state: RecordState::Active,
        }
    }

    pub(crate) fn from_parts(
        id: i64,
        draft: CategoryDraft,
        created_at: DateTime<Utc>,
        modified_at: DateTime<Utc>,
        state: RecordState,
    ) -> Self {
        Self {
            id,
            name: draft.name,
            color: draft.color,
            icon: draft.icon,
            created_at,
            modified_at,
            state,
        }
    }

    /// Storage id (0 until stored).
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Soft-delete state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// The caller-editable fields.
    pub fn draft(&self) -> CategoryDraft {
        CategoryDraft {
            name: self.name.clone(),
            color: self.color.clone(),
            icon: self.icon.clone(),
        }
    }

    /// Copy the editable fields from `draft`.
    pub fn apply(&mut self, draft: CategoryDraft) {
        self.name = draft.name;
        self.color = draft.color;
        self.icon = draft.icon;
    }

    pub(crate) fn set_modified_at(&mut self, at: DateTime<Utc>) {
        self.modified_at = at;
    }

    pub(crate) fn set_state(&mut self, state: RecordState) {
        self.state = state;
    }
}

/// A category with the number of live tasks that reference it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCounts {
    /// The category.
    #[serde(flatten)]
    pub category: Category,
    /// Live tasks in this category.
    pub task_count: u32,
    /// Live completed tasks in this category.
    pub completed_task_count: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Task
// ─────────────────────────────────────────────────────────────────────────────

/// Fields a caller supplies to create or edit a task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    /// Short title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Priority (default medium).
    pub priority: Priority,
    /// Owning category, `None` for uncategorized.
    pub category_id: Option<i64>,
}

impl TaskDraft {
    /// Draft with the given title and defaults for everything else.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// A stored task.
///
/// Deserialization rejects a completion flag that disagrees with
/// `completedAt`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRepr")]
pub struct Task {
    id: i64,
    uuid: Uuid,
    /// Short title.
    pub title: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Priority.
    pub priority: Priority,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    /// Owning category id.
    pub category_id: Option<i64>,
    /// Owning category, loaded alongside the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    state: RecordState,
}

/// Wire shape of [`Task`], checked before it becomes one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRepr {
    id: i64,
    uuid: Uuid,
    title: String,
    description: Option<String>,
    due_date: Option<DateTime<Utc>>,
    priority: Priority,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    category_id: Option<i64>,
    #[serde(default)]
    category: Option<Category>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    state: RecordState,
}

impl TryFrom<TaskRepr> for Task {
    type Error = String;

    fn try_from(repr: TaskRepr) -> Result<Self, Self::Error> {
        if repr.is_completed != repr.completed_at.is_some() {
            return Err(format!(
                "task {}: isCompleted is {} but completedAt is {}",
                repr.id,
                repr.is_completed,
                if repr.completed_at.is_some() { "set" } else { "missing" }
            ));
        }
        Ok(Self {
            id: repr.id,
            uuid: repr.uuid,
            title: repr.title,
            description: repr.description,
            due_date: repr.due_date,
            priority: repr.priority,
            is_completed: repr.is_completed,
            completed_at: repr.completed_at,
            category_id: repr.category_id,
            category: repr.category,
            created_at: repr.created_at,
            modified_at: repr.modified_at,
            state: repr.state,
        })
    }
}

/// Persisted columns of a task row, before navigation is attached.
pub(crate) struct TaskRow {
    pub id: i64,
    pub uuid: Uuid,
    pub draft: TaskDraft,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub state: RecordState,
}

impl Task {
    /// Build an unsaved, pending task from a draft with a fresh uuid.
    pub fn from_draft(draft: TaskDraft, at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            uuid: Uuid::now_v7(),
            title: draft.title,
            description: draft.description,
            due_date: draft.due_date,
            priority: draft.priority,
            is_completed: false,
            completed_at: None,
            category_id: draft.category_id,
            category: None,
            created_at: at,
            modified_at: at,
            state: RecordState::Active,
        }
    }

    pub(crate) fn from_row_parts(row: TaskRow) -> Self {
        Self {
            id: row.id,
            uuid: row.uuid,
            title: row.draft.title,
            description: row.draft.description,
            due_date: row.draft.due_date,
            priority: row.draft.priority,
            is_completed: row.completed_at.is_some(),
            completed_at: row.completed_at,
            category_id: row.draft.category_id,
            category: None,
            created_at: row.created_at,
            modified_at: row.modified_at,
            state: row.state,
        }
    }

    /// Storage id (0 until stored).
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Globally unique identifier assigned at construction.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Whether the task is done.
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// When the task was completed, if it is.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last modification timestamp.
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    /// Soft-delete state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Mark complete (stamping `completed_at`) or pending (clearing it).
    ///
    /// Setting the current value again is a no-op, so the original
    /// completion time survives repeated calls.
    pub fn set_completed(&mut self, completed: bool, at: DateTime<Utc>) {
        if self.is_completed == completed {
            return;
        }
        self.is_completed = completed;
        self.completed_at = completed.then_some(at);
    }

    /// Not completed and due strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }

    /// The caller-editable fields.
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            priority: self.priority,
            category_id: self.category_id,
        }
    }

    /// Copy the editable fields from `draft`, leaving identity, audit and
    /// completion untouched. Drops the loaded category if the id changed.
    pub fn apply(&mut self, draft: TaskDraft) {
        if self.category_id != draft.category_id {
            self.category = None;
        }
        self.title = draft.title;
        self.description = draft.description;
        self.due_date = draft.due_date;
        self.priority = draft.priority;
        self.category_id = draft.category_id;
    }

    pub(crate) fn set_modified_at(&mut self, at: DateTime<Utc>) {
        self.modified_at = at;
    }

    pub(crate) fn set_state(&mut self, state: RecordState) {
        self.state = state;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn priority_round_trips_through_sql() {
        for p in Priority::ALL {
            assert_eq!(Priority::from_sql(p.as_sql()), Some(p));
        }
        assert_eq!(Priority::from_sql(7), None);
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_serializes_lowercase() {
        let json = serde_json::to_string(&Priority::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
    }

    #[test]
    fn new_task_is_pending_and_active() {
        let at = now();
        let task = Task::from_draft(TaskDraft::new("Buy milk"), at);
        assert_eq!(task.id(), 0);
        assert!(!task.is_completed());
        assert!(task.completed_at().is_none());
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created_at(), task.modified_at());
        assert_eq!(task.state(), RecordState::Active);
    }

    #[test]
    fn each_task_gets_its_own_uuid() {
        let at = now();
        let a = Task::from_draft(TaskDraft::new("One"), at);
        let b = Task::from_draft(TaskDraft::new("Two"), at);
        assert_ne!(a.uuid(), b.uuid());
    }

    #[test]
    fn completion_stamps_and_clears_timestamp() {
        let at = now();
        let mut task = Task::from_draft(TaskDraft::new("Buy milk"), at);

        task.set_completed(true, at);
        assert!(task.is_completed());
        assert_eq!(task.completed_at(), Some(at));

        task.set_completed(false, at);
        assert!(!task.is_completed());
        assert!(task.completed_at().is_none());
    }

    #[test]
    fn repeated_completion_keeps_first_timestamp() {
        let first = now();
        let mut task = Task::from_draft(TaskDraft::new("Buy milk"), first);
        task.set_completed(true, first);
        task.set_completed(true, first + Duration::hours(1));
        assert_eq!(task.completed_at(), Some(first));
    }

    #[test]
    fn overdue_requires_past_due_and_pending() {
        let at = now();
        let mut task = Task::from_draft(
            TaskDraft {
                due_date: Some(at - Duration::days(1)),
                ..TaskDraft::new("Late")
            },
            at,
        );
        assert!(task.is_overdue(at));
        task.set_completed(true, at);
        assert!(!task.is_overdue(at));

        let no_due = Task::from_draft(TaskDraft::new("Someday"), at);
        assert!(!no_due.is_overdue(at));
    }

    #[test]
    fn apply_preserves_identity() {
        let at = now();
        let mut task = Task::from_draft(TaskDraft::new("Old title"), at);
        let uuid = task.uuid();
        task.apply(TaskDraft {
            priority: Priority::High,
            ..TaskDraft::new("New title")
        });
        assert_eq!(task.uuid(), uuid);
        assert_eq!(task.title, "New title");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.created_at(), at);
    }

    #[test]
    fn category_draft_defaults() {
        let draft = CategoryDraft::new("Work");
        assert_eq!(draft.color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(draft.icon, DEFAULT_CATEGORY_ICON);
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = Task::from_draft(TaskDraft::new("Buy milk"), now());
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("isCompleted").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("category").is_none());
    }

    #[test]
    fn task_json_round_trips() {
        let mut task = Task::from_draft(TaskDraft::new("Buy milk"), now());
        task.set_completed(true, now());
        let value = serde_json::to_value(&task).unwrap();
        let back: Task = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn deserialize_rejects_mismatched_completion() {
        let task = Task::from_draft(TaskDraft::new("Buy milk"), now());
        let mut value = serde_json::to_value(&task).unwrap();
        value["isCompleted"] = serde_json::Value::Bool(true);
        let err = serde_json::from_value::<Task>(value).unwrap_err();
        assert!(err.to_string().contains("completedAt is missing"));

        let mut value = serde_json::to_value(&task).unwrap();
        value["completedAt"] = serde_json::to_value(now()).unwrap();
        assert!(serde_json::from_value::<Task>(value).is_err());
    }
}
