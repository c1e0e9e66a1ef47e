//! Field rules for drafts and ids.
//!
//! Lengths are counted in characters, not bytes. Every failure names the
//! offending field in camelCase so a front-end can attach the message to the
//! right input.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use todo_store::{CategoryDraft, TaskDraft};

use crate::errors::{Result, TodoError};

/// Title length bounds.
pub const TITLE_MIN_CHARS: usize = 3;
/// Title length bounds.
pub const TITLE_MAX_CHARS: usize = 200;
/// Maximum description length.
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
/// Category name length bounds.
pub const NAME_MIN_CHARS: usize = 2;
/// Category name length bounds.
pub const NAME_MAX_CHARS: usize = 100;
/// Maximum icon identifier length.
pub const ICON_MAX_CHARS: usize = 50;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").expect("valid regex"));

/// Check a task draft. `today` is the current UTC date; due dates before it
/// are rejected, due dates on it are accepted.
pub fn validate_task(draft: &TaskDraft, today: NaiveDate) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(TodoError::validation("title", "is required"));
    }
    let title_len = draft.title.chars().count();
    if title_len < TITLE_MIN_CHARS {
        return Err(TodoError::validation(
            "title",
            format!("must be at least {TITLE_MIN_CHARS} characters"),
        ));
    }
    if title_len > TITLE_MAX_CHARS {
        return Err(TodoError::validation(
            "title",
            format!("must not exceed {TITLE_MAX_CHARS} characters"),
        ));
    }

    if let Some(description) = &draft.description {
        if description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(TodoError::validation(
                "description",
                format!("must not exceed {DESCRIPTION_MAX_CHARS} characters"),
            ));
        }
    }

    if let Some(due) = draft.due_date {
        if due.date_naive() < today {
            return Err(TodoError::validation("dueDate", "cannot be in the past"));
        }
    }

    if let Some(category_id) = draft.category_id {
        validate_id("categoryId", category_id)?;
    }

    Ok(())
}

/// Check a category draft.
pub fn validate_category(draft: &CategoryDraft) -> Result<()> {
    validate_category_name(&draft.name)?;

    if draft.color.trim().is_empty() {
        return Err(TodoError::validation("color", "is required"));
    }
    if !HEX_COLOR.is_match(&draft.color) {
        return Err(TodoError::validation(
            "color",
            "must be a hex color like #RRGGBB or #RGB",
        ));
    }

    if draft.icon.trim().is_empty() {
        return Err(TodoError::validation("icon", "is required"));
    }
    if draft.icon.chars().count() > ICON_MAX_CHARS {
        return Err(TodoError::validation(
            "icon",
            format!("must not exceed {ICON_MAX_CHARS} characters"),
        ));
    }

    Ok(())
}

fn validate_category_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TodoError::validation("name", "is required"));
    }
    let len = name.chars().count();
    if len < NAME_MIN_CHARS {
        return Err(TodoError::validation(
            "name",
            format!("must be at least {NAME_MIN_CHARS} characters"),
        ));
    }
    if len > NAME_MAX_CHARS {
        return Err(TodoError::validation(
            "name",
            format!("must not exceed {NAME_MAX_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Ids must be positive.
pub fn validate_id(field: &'static str, id: i64) -> Result<()> {
    if id <= 0 {
        return Err(TodoError::invalid_id(field, id));
    }
    Ok(())
}
