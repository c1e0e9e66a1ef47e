//! Human-readable and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use todo_services::TaskPage;
use todo_store::{Category, CategoryWithCounts, Task, TaskStatistics};

/// Result of one command, renderable either way.
#[derive(Debug)]
pub struct Report {
    json: Value,
    text: String,
}

impl Report {
    /// Pair a serializable value with its text rendering.
    pub fn new<T: Serialize>(value: &T, text: impl Into<String>) -> Result<Self> {
        Ok(Self {
            json: serde_json::to_value(value)?,
            text: text.into(),
        })
    }

    /// Plain acknowledgement with no payload.
    pub fn message(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            json: serde_json::json!({ "message": text }),
            text,
        }
    }

    /// Final output string.
    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            Ok(serde_json::to_string_pretty(&self.json)?)
        } else {
            Ok(self.text.clone())
        }
    }
}

/// One line per task: `#3 [x] Title (high, due 2030-01-15, Work)`.
pub fn task_line(task: &Task) -> String {
    let mark = if task.is_completed() { 'x' } else { ' ' };
    let mut details = vec![task.priority.to_string()];
    if let Some(due) = task.due_date {
        details.push(format!("due {}", due.format("%Y-%m-%d")));
    }
    if let Some(category) = &task.category {
        details.push(category.name.clone());
    }
    format!("#{} [{mark}] {} ({})", task.id(), task.title, details.join(", "))
}

/// Full view of one task.
pub fn task_detail(task: &Task) -> String {
    let mut out = task_line(task);
    if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(out, "\n  {description}");
    }
    let _ = write!(
        out,
        "\n  created {}  modified {}",
        task.created_at().format("%Y-%m-%d %H:%M"),
        task.modified_at().format("%Y-%m-%d %H:%M")
    );
    if let Some(done) = task.completed_at() {
        let _ = write!(out, "\n  completed {}", done.format("%Y-%m-%d %H:%M"));
    }
    out
}

/// Lines for a plain task list.
pub fn task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "no tasks".to_string();
    }
    tasks.iter().map(task_line).collect::<Vec<_>>().join("\n")
}

/// Task list with a paging footer.
pub fn task_page(page: &TaskPage) -> String {
    format!(
        "{}\npage {}/{} ({} total)",
        task_list(&page.tasks),
        page.page,
        page.total_pages.max(1),
        page.total
    )
}

/// Counter summary.
pub fn statistics(stats: &TaskStatistics) -> String {
    format!(
        "total {}  completed {}  pending {}  overdue {}",
        stats.total, stats.completed, stats.pending, stats.overdue
    )
}

/// `#2 Work #007ACC FolderOutline`.
pub fn category_line(category: &Category) -> String {
    format!(
        "#{} {} {} {}",
        category.id(),
        category.name,
        category.color,
        category.icon
    )
}

/// Categories with `done/total` task counts.
pub fn category_list(categories: &[CategoryWithCounts]) -> String {
    if categories.is_empty() {
        return "no categories".to_string();
    }
    categories
        .iter()
        .map(|c| {
            format!(
                "{}  {}/{} done",
                category_line(&c.category),
                c.completed_task_count,
                c.task_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use todo_store::{CategoryDraft, Priority, TaskDraft};

    use super::*;

    fn task() -> Task {
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        let mut task = Task::from_draft(
            TaskDraft {
                description: Some("Quarterly numbers".into()),
                due_date: Some(Utc.with_ymd_and_hms(2030, 1, 15, 0, 0, 0).unwrap()),
                priority: Priority::High,
                ..TaskDraft::new("Write report")
            },
            at,
        );
        task.category = Some(Category::from_draft(CategoryDraft::new("Work"), at));
        task
    }

    #[test]
    fn task_line_shows_details() {
        assert_eq!(
            task_line(&task()),
            "#0 [ ] Write report (high, due 2030-01-15, Work)"
        );
    }

    #[test]
    fn completed_task_is_marked() {
        let mut task = task();
        task.set_completed(true, Utc::now());
        assert!(task_line(&task).contains("[x]"));
        assert!(task_detail(&task).contains("completed "));
    }

    #[test]
    fn detail_includes_description() {
        assert!(task_detail(&task()).contains("\n  Quarterly numbers"));
    }

    #[test]
    fn empty_lists() {
        assert_eq!(task_list(&[]), "no tasks");
        assert_eq!(category_list(&[]), "no categories");
    }

    #[test]
    fn report_renders_both_ways() {
        let report = Report::new(&task(), "text").unwrap();
        assert_eq!(report.render(false).unwrap(), "text");
        let json: Value = serde_json::from_str(&report.render(true).unwrap()).unwrap();
        assert_eq!(json["title"], "Write report");
        assert_eq!(json["priority"], "high");
    }
}
