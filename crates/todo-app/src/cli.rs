//! Command-line surface.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use todo_settings::LogLevel;
use todo_store::Priority;

/// Local task and category manager.
#[derive(Parser, Debug)]
#[command(name = "todo", version, about = "Local task and category manager")]
pub struct Cli {
    /// Path to the `SQLite` database (overrides settings).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Log level for stderr output (overrides settings; `RUST_LOG` wins).
    #[arg(long, global = true, value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level command groups.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage tasks.
    #[command(subcommand)]
    Task(TaskCommand),
    /// Manage categories.
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Inspect or change settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// `todo task ...`
#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// List tasks, optionally filtered.
    List(ListArgs),
    /// Show one task.
    Show {
        /// Task id.
        id: i64,
    },
    /// Change a task's fields.
    Edit {
        /// Task id.
        id: i64,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the due date.
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        /// Remove the category.
        #[arg(long, conflicts_with = "category")]
        no_category: bool,
    },
    /// Toggle a task between done and pending.
    Done {
        /// Task id.
        id: i64,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: i64,
    },
    /// List pending tasks that are past due.
    Overdue,
    /// Show task counters.
    Stats,
}

/// Optional task fields shared by `add` and `edit`.
#[derive(Args, Debug, Default)]
pub struct TaskFields {
    /// Longer description.
    #[arg(long)]
    pub description: Option<String>,
    /// Due date (`YYYY-MM-DD` or RFC 3339).
    #[arg(long, value_parser = parse_due_date)]
    pub due: Option<DateTime<Utc>>,
    /// low, medium, high or critical.
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Category id.
    #[arg(long)]
    pub category: Option<i64>,
}

/// Filters and paging for `todo task list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Case-insensitive text to find in title or description.
    #[arg(long)]
    pub search: Option<String>,
    /// Only tasks in this category.
    #[arg(long)]
    pub category: Option<i64>,
    /// Only tasks with this priority.
    #[arg(long)]
    pub priority: Option<Priority>,
    /// Only completed tasks.
    #[arg(long, conflicts_with = "pending")]
    pub completed: bool,
    /// Only pending tasks.
    #[arg(long)]
    pub pending: bool,
    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Tasks per page.
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
}

impl ListArgs {
    /// Completion filter implied by `--completed` / `--pending`.
    pub fn completion(&self) -> Option<bool> {
        match (self.completed, self.pending) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// `todo category ...`
#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        /// Category name.
        name: String,
        /// Hex color such as `#FF8800`.
        #[arg(long)]
        color: Option<String>,
        /// Icon name.
        #[arg(long)]
        icon: Option<String>,
    },
    /// List categories with task counts.
    List,
    /// Change a category.
    Edit {
        /// Category id.
        id: i64,
        /// New name.
        #[arg(long)]
        name: Option<String>,
        /// New hex color.
        #[arg(long)]
        color: Option<String>,
        /// New icon name.
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a category that has no active tasks.
    Delete {
        /// Category id.
        id: i64,
    },
}

/// `todo settings ...`
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the effective settings.
    Show,
    /// Store one value, e.g. `preferences.theme dark`.
    Set {
        /// Dotted key.
        key: String,
        /// JSON value; bare words are stored as strings.
        value: String,
    },
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp. A bare date means the
/// last microsecond of that day in UTC, so the task is due all day.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|end| end.and_utc())
            .ok_or_else(|| format!("invalid date '{raw}'"));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{raw}' (expected YYYY-MM-DD or RFC 3339)"))
}

fn parse_log_level(raw: &str) -> Result<LogLevel, String> {
    raw.parse().map_err(|e: todo_settings::SettingsError| e.to_string())
}
