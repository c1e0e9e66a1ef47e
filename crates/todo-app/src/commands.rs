//! Command handlers. Each returns a [`Report`]; printing is left to `main`.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use todo_services::{TodoError, TodoServices};
use todo_settings::TodoSettings;
use todo_store::{CategoryDraft, TaskDraft, TaskFilter};
use tracing::debug;

use crate::cli::{CategoryCommand, ListArgs, SettingsCommand, TaskCommand, TaskFields};
use crate::render::{self, Report};

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

/// Run a `todo task` subcommand.
pub async fn run_task(services: &TodoServices, command: TaskCommand) -> Result<Report> {
    let tasks = &services.tasks;
    match command {
        TaskCommand::Add { title, fields } => {
            let draft = TaskDraft {
                description: fields.description,
                due_date: fields.due,
                priority: fields.priority.unwrap_or_default(),
                category_id: fields.category,
                ..TaskDraft::new(title)
            };
            let task = tasks.create_task(draft).await?;
            Report::new(&task, format!("created {}", render::task_line(&task)))
        }
        TaskCommand::List(args) => {
            let filter = list_filter(&args);
            let page = tasks.list_tasks(&filter, args.page, args.page_size).await?;
            Report::new(&page, render::task_page(&page))
        }
        TaskCommand::Show { id } => {
            let task = tasks
                .get_task_by_id(id)
                .await?
                .ok_or_else(|| TodoError::task_not_found(id))?;
            Report::new(&task, render::task_detail(&task))
        }
        TaskCommand::Edit {
            id,
            title,
            fields,
            clear_due,
            no_category,
        } => {
            let mut task = tasks
                .get_task_by_id(id)
                .await?
                .ok_or_else(|| TodoError::task_not_found(id))?;
            let TaskFields {
                description,
                due,
                priority,
                category,
            } = fields;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = description {
                task.description = Some(description).filter(|d| !d.is_empty());
            }
            if clear_due {
                task.due_date = None;
            } else if due.is_some() {
                task.due_date = due;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if no_category {
                task.category_id = None;
            } else if category.is_some() {
                task.category_id = category;
            }
            let task = tasks.update_task(&task).await?;
            Report::new(&task, format!("updated {}", render::task_line(&task)))
        }
        TaskCommand::Done { id } => {
            let task = tasks.toggle_task_completion(id).await?;
            let state = if task.is_completed() { "done" } else { "pending" };
            Report::new(&task, format!("task #{id} is now {state}"))
        }
        TaskCommand::Delete { id } => {
            tasks.delete_task(id).await?;
            Ok(Report::message(format!("deleted task #{id}")))
        }
        TaskCommand::Overdue => {
            let overdue = tasks.get_overdue_tasks().await?;
            Report::new(&overdue, render::task_list(&overdue))
        }
        TaskCommand::Stats => {
            let stats = tasks.statistics().await?;
            Report::new(&stats, render::statistics(&stats))
        }
    }
}

fn list_filter(args: &ListArgs) -> TaskFilter {
    TaskFilter {
        search: args.search.clone(),
        category_id: args.category,
        priority: args.priority,
        is_completed: args.completion(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

/// Run a `todo category` subcommand.
pub async fn run_category(services: &TodoServices, command: CategoryCommand) -> Result<Report> {
    let categories = &services.categories;
    match command {
        CategoryCommand::Add { name, color, icon } => {
            let mut draft = CategoryDraft::new(name);
            if let Some(color) = color {
                draft.color = color;
            }
            if let Some(icon) = icon {
                draft.icon = icon;
            }
            let category = categories.create_category(draft).await?;
            Report::new(&category, format!("created {}", render::category_line(&category)))
        }
        CategoryCommand::List => {
            let listed = categories.list_categories_with_counts().await?;
            Report::new(&listed, render::category_list(&listed))
        }
        CategoryCommand::Edit {
            id,
            name,
            color,
            icon,
        } => {
            let mut category = categories
                .get_category_by_id(id)
                .await?
                .ok_or_else(|| TodoError::category_not_found(id))?;
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(color) = color {
                category.color = color;
            }
            if let Some(icon) = icon {
                category.icon = icon;
            }
            let category = categories.update_category(&category).await?;
            Report::new(&category, format!("updated {}", render::category_line(&category)))
        }
        CategoryCommand::Delete { id } => {
            categories.delete_category(id).await?;
            Ok(Report::message(format!("deleted category #{id}")))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Run a `todo settings` subcommand against the file at `path`.
pub fn run_settings(
    command: SettingsCommand,
    path: &Path,
    effective: &TodoSettings,
) -> Result<Report> {
    match command {
        SettingsCommand::Show => {
            let text = format!(
                "# {}\n{}",
                path.display(),
                serde_json::to_string_pretty(effective)?
            );
            Report::new(effective, text)
        }
        SettingsCommand::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            debug!(%key, %value, "updating setting");
            let patch = todo_settings::dotted_patch(&key, value)?;
            let updated = todo_settings::update_settings_at_path(path, patch)
                .with_context(|| format!("failed to update {}", path.display()))?;
            Report::new(&updated, format!("saved {key} to {}", path.display()))
        }
    }
}
