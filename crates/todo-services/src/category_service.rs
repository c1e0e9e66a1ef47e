//! Category lifecycle with name uniqueness and a guarded delete.
//!
//! Names are unique among live categories (exact, case-sensitive match).
//! The check runs before the write; the partial unique index backs it up,
//! and an index rejection is reported as the same conflict.
//!
//! A category cannot be deleted while any live task references it.

use tokio::sync::broadcast;
use tracing::{info, instrument};

use todo_store::model;
use todo_store::{
    Category, CategoryDraft, CategoryQueries, CategoryWithCounts, Repository, SqliteRepository,
    StoreError, Task, TaskQueries,
};

use crate::database::Database;
use crate::errors::{Result, TodoError};
use crate::events::{ChangeEvent, ChangeKind, ChangeNotifier, EntityKind};
use crate::validation::{validate_category, validate_id};

/// Category operations over a shared [`Database`].
#[derive(Clone, Debug)]
pub struct CategoryService {
    db: Database,
    notifier: ChangeNotifier,
}

impl CategoryService {
    /// Create a service publishing changes on `notifier`.
    pub fn new(db: Database, notifier: ChangeNotifier) -> Self {
        Self { db, notifier }
    }

    /// Receive change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Validate and store a new category with a unique name.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        validate_category(&draft)?;

        let category = self
            .db
            .run(move |conn| {
                let repo = SqliteRepository::<Category>::new(conn);
                if repo.find_by_name(&draft.name)?.is_some() {
                    return Err(duplicate_name(&draft.name));
                }
                let name = draft.name.clone();
                repo.add(&Category::from_draft(draft, model::now()))
                    .map_err(|e| conflict_on_unique(e, &name))
            })
            .await?;

        info!(id = category.id(), "category created");
        self.notifier
            .publish(EntityKind::Category, category.id(), ChangeKind::Created);
        Ok(category)
    }

    /// Copy name, color and icon onto the stored category with the same id.
    #[instrument(skip(self, category), fields(id = category.id()))]
    pub async fn update_category(&self, category: &Category) -> Result<Category> {
        let id = category.id();
        validate_id("id", id)?;
        let draft = category.draft();
        validate_category(&draft)?;

        let updated = self
            .db
            .run(move |conn| {
                let repo = SqliteRepository::<Category>::new(conn);
                let mut existing = repo
                    .get_by_id(id)?
                    .ok_or_else(|| TodoError::category_not_found(id))?;

                if existing.name != draft.name
                    && repo
                        .find_by_name(&draft.name)?
                        .is_some_and(|other| other.id() != id)
                {
                    return Err(duplicate_name(&draft.name));
                }

                let name = draft.name.clone();
                existing.apply(draft);
                repo.update(&mut existing)
                    .map_err(|e| conflict_on_unique(e, &name))?;
                Ok(existing)
            })
            .await?;

        info!(id, "category updated");
        self.notifier
            .publish(EntityKind::Category, id, ChangeKind::Updated);
        Ok(updated)
    }

    /// Soft-delete a category that no live task references.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        validate_id("id", id)?;

        self.db
            .run(move |conn| {
                let repo = SqliteRepository::<Category>::new(conn);
                let category = repo
                    .get_by_id(id)?
                    .ok_or_else(|| TodoError::category_not_found(id))?;

                let active = SqliteRepository::<Task>::new(conn).count_active_by_category(id)?;
                if active > 0 {
                    return Err(TodoError::Conflict(format!(
                        "cannot delete category '{}' because it has {active} active task(s)",
                        category.name
                    )));
                }

                if !repo.delete(id)? {
                    return Err(TodoError::category_not_found(id));
                }
                Ok(())
            })
            .await?;

        info!(id, "category deleted");
        self.notifier
            .publish(EntityKind::Category, id, ChangeKind::Deleted);
        Ok(())
    }

    /// Live category by id, `None` if there is none.
    #[instrument(skip(self))]
    pub async fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        validate_id("id", id)?;
        self.db
            .run(move |conn| Ok(SqliteRepository::<Category>::new(conn).get_by_id(id)?))
            .await
    }

    /// Every live category.
    pub async fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.db
            .run(|conn| Ok(SqliteRepository::<Category>::new(conn).get_all()?))
            .await
    }

    /// Live categories by name, with live task counts.
    pub async fn list_categories_with_counts(&self) -> Result<Vec<CategoryWithCounts>> {
        self.db
            .run(|conn| Ok(SqliteRepository::<Category>::new(conn).list_with_counts()?))
            .await
    }

    /// Live category with exactly this name.
    #[instrument(skip(self))]
    pub async fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        if name.trim().is_empty() {
            return Err(TodoError::validation("name", "cannot be empty"));
        }
        let name = name.to_string();
        self.db
            .run(move |conn| Ok(SqliteRepository::<Category>::new(conn).find_by_name(&name)?))
            .await
    }

    /// Whether any live task references the category.
    #[instrument(skip(self))]
    pub async fn category_has_tasks(&self, id: i64) -> Result<bool> {
        validate_id("id", id)?;
        let count = self
            .db
            .run(move |conn| Ok(SqliteRepository::<Task>::new(conn).count_active_by_category(id)?))
            .await?;
        Ok(count > 0)
    }
}

fn duplicate_name(name: &str) -> TodoError {
    TodoError::Conflict(format!("category with name '{name}' already exists"))
}

fn conflict_on_unique(err: StoreError, name: &str) -> TodoError {
    if err.is_unique_violation() {
        duplicate_name(name)
    } else {
        err.into()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
