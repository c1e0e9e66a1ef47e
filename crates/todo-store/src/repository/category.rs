//! Category storage: row codec plus name lookup and task counts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

use super::{state_from_row, Criteria, Entity, Repository, SqlTimestamp, SqliteRepository};
use crate::errors::Result;
use crate::model::{Category, CategoryDraft, CategoryWithCounts, RecordState, Task};

/// Category-specific reads on top of [`Repository`].
pub trait CategoryQueries {
    /// First live category whose name equals `name` exactly.
    fn find_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Live categories ordered by name, each with its live task counts.
    fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>>;
}

impl CategoryQueries for SqliteRepository<'_, Category> {
    fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let found = self.find(&Criteria::new().eq("name", name.to_string()).limit(1))?;
        Ok(found.into_iter().next())
    }

    fn list_with_counts(&self) -> Result<Vec<CategoryWithCounts>> {
        let categories = self.find(&Criteria::new().order_by("name, id"))?;
        let counts = task_counts(self.conn())?;

        Ok(categories
            .into_iter()
            .map(|category| {
                let (task_count, completed_task_count) =
                    counts.get(&category.id()).copied().unwrap_or_default();
                CategoryWithCounts {
                    category,
                    task_count,
                    completed_task_count,
                }
            })
            .collect())
    }
}

/// `(live, live completed)` task counts keyed by category id.
fn task_counts(conn: &Connection) -> Result<HashMap<i64, (u32, u32)>> {
    let criteria = Criteria::new().condition("category_id IS NOT NULL", Vec::<Value>::new());
    let sql = format!(
        "SELECT category_id, COUNT(*), COALESCE(SUM(is_completed), 0) \
         FROM {} {} GROUP BY category_id",
        <Task as Entity>::TABLE,
        criteria.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let counts = stmt
        .query_map(params_from_iter(criteria.values()), |row| {
            Ok((row.get::<_, i64>(0)?, (row.get(1)?, row.get(2)?)))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;
    Ok(counts)
}

// ─────────────────────────────────────────────────────────────────────────────
// Row codec
// ─────────────────────────────────────────────────────────────────────────────

impl Entity for Category {
    const TABLE: &'static str = "categories";
    const KIND: &'static str = "Category";

    fn id(&self) -> i64 {
        Category::id(self)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: SqlTimestamp = row.get("created_at")?;
        let modified_at: SqlTimestamp = row.get("modified_at")?;
        Ok(Category::from_parts(
            row.get("id")?,
            CategoryDraft {
                name: row.get("name")?,
                color: row.get("color")?,
                icon: row.get("icon")?,
            },
            created_at.0,
            modified_at.0,
            state_from_row(row)?,
        ))
    }

    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64> {
        let _ = conn.execute(
            "INSERT INTO categories (name, color, icon, created_at, modified_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.name,
                self.color,
                self.icon,
                SqlTimestamp(self.created_at()),
                SqlTimestamp(self.modified_at()),
                self.state().is_deleted(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn write(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE categories SET name = ?1, color = ?2, icon = ?3, modified_at = ?4,
             is_deleted = ?5
             WHERE id = ?6",
            params![
                self.name,
                self.color,
                self.icon,
                SqlTimestamp(self.modified_at()),
                self.state().is_deleted(),
                Category::id(self),
            ],
        )
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.set_modified_at(at);
    }

    fn mark_deleted(&mut self) {
        self.set_state(RecordState::Deleted);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::model::{self, TaskDraft};

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn add_category(conn: &Connection, draft: CategoryDraft) -> Category {
        SqliteRepository::<Category>::new(conn)
            .add(&Category::from_draft(draft, model::now()))
            .unwrap()
    }

    fn add_task(conn: &Connection, title: &str, category_id: i64) -> Task {
        let draft = TaskDraft {
            category_id: Some(category_id),
            ..TaskDraft::new(title)
        };
        SqliteRepository::<Task>::new(conn)
            .add(&Task::from_draft(draft, model::now()))
            .unwrap()
    }

    #[test]
    fn category_columns_round_trip() {
        let conn = setup_db();
        let created = add_category(
            &conn,
            CategoryDraft {
                name: "Garden".into(),
                color: "#0F0".into(),
                icon: "Leaf".into(),
            },
        );
        let fetched = SqliteRepository::<Category>::new(&conn)
            .get_by_id(created.id())
            .unwrap()
            .unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.color, "#0F0");
        assert_eq!(fetched.icon, "Leaf");
    }

    #[test]
    fn find_by_name_is_exact_and_skips_deleted() {
        let conn = setup_db();
        let repo = SqliteRepository::<Category>::new(&conn);
        let old = add_category(&conn, CategoryDraft::new("Work"));
        repo.delete(old.id()).unwrap();
        assert!(repo.find_by_name("Work").unwrap().is_none());

        let current = add_category(&conn, CategoryDraft::new("Work"));
        assert_eq!(repo.find_by_name("Work").unwrap().map(|c| c.id()), Some(current.id()));
        assert!(repo.find_by_name("work").unwrap().is_none());
    }

    #[test]
    fn duplicate_live_name_violates_index() {
        let conn = setup_db();
        add_category(&conn, CategoryDraft::new("Home"));
        let repo = SqliteRepository::<Category>::new(&conn);
        let result = repo.add(&Category::from_draft(CategoryDraft::new("Home"), model::now()));
        assert!(result.is_err());
    }

    #[test]
    fn list_with_counts_orders_by_name() {
        let conn = setup_db();
        let work = add_category(&conn, CategoryDraft::new("Work"));
        let home = add_category(&conn, CategoryDraft::new("Home"));
        add_category(&conn, CategoryDraft::new("Errands"));

        add_task(&conn, "Report", work.id());
        let mut done = add_task(&conn, "Slides", work.id());
        done.set_completed(true, model::now());
        SqliteRepository::<Task>::new(&conn).update(&mut done).unwrap();
        let gone = add_task(&conn, "Dishes", home.id());
        SqliteRepository::<Task>::new(&conn).delete(gone.id()).unwrap();

        let listed = SqliteRepository::<Category>::new(&conn).list_with_counts().unwrap();
        let summary: Vec<_> = listed
            .iter()
            .map(|c| (c.category.name.as_str(), c.task_count, c.completed_task_count))
            .collect();
        assert_eq!(
            summary,
            vec![("Errands", 0, 0), ("Home", 0, 0), ("Work", 2, 1)]
        );
    }

    #[test]
    fn list_with_counts_serializes_flat() {
        let conn = setup_db();
        add_category(&conn, CategoryDraft::new("Work"));
        let listed = SqliteRepository::<Category>::new(&conn).list_with_counts().unwrap();
        let value = serde_json::to_value(&listed[0]).unwrap();
        assert_eq!(value["name"], "Work");
        assert_eq!(value["taskCount"], 0);
    }
}
