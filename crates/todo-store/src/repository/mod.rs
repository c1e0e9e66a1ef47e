//! Generic CRUD over stored entities.
//!
//! [`Repository`] is the one contract every entity shares; [`SqliteRepository`]
//! implements it over a borrowed `rusqlite::Connection`. Entity-specific
//! queries live in extension traits next to each entity ([`TaskQueries`],
//! [`CategoryQueries`]).
//!
//! The soft-delete filter (`is_deleted = 0`) is added here, in
//! [`Criteria::where_clause`], for every read. Call sites never write it
//! themselves; [`Criteria::include_deleted`] is the only way around it.

mod category;
mod task;

pub use category::CategoryQueries;
pub use task::{TaskFilter, TaskListResult, TaskQueries, TaskStatistics};

use std::marker::PhantomData;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::model::{self, RecordState};

// ─────────────────────────────────────────────────────────────────────────────
// Entity contract
// ─────────────────────────────────────────────────────────────────────────────

/// A record type the generic repository can store.
pub trait Entity: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Human-readable kind used in errors ("Task", "Category").
    const KIND: &'static str;

    /// Storage id (0 when unsaved).
    fn id(&self) -> i64;

    /// Decode one row of `SELECT * FROM {TABLE}`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Insert every column except `id`; returns the new row id.
    fn insert(&self, conn: &Connection) -> rusqlite::Result<i64>;

    /// Overwrite every column of the row with this id; returns rows changed.
    fn write(&self, conn: &Connection) -> rusqlite::Result<usize>;

    /// Stamp the modification time.
    fn touch(&mut self, at: DateTime<Utc>);

    /// Flip the record to [`RecordState::Deleted`].
    fn mark_deleted(&mut self);

    /// Attach navigation data after a read. Default: nothing to load.
    fn load_related(_conn: &Connection, _items: &mut [Self]) -> Result<()> {
        Ok(())
    }
}

/// CRUD operations shared by every entity type.
pub trait Repository<T: Entity> {
    /// Live entity with this id.
    fn get_by_id(&self, id: i64) -> Result<Option<T>>;

    /// All live entities.
    fn get_all(&self) -> Result<Vec<T>>;

    /// Live entities matching `criteria`.
    fn find(&self, criteria: &Criteria) -> Result<Vec<T>>;

    /// Insert `entity` and return it as stored (id populated).
    fn add(&self, entity: &T) -> Result<T>;

    /// Stamp `modified_at` and persist the full state of `entity`.
    ///
    /// Fails with [`StoreError::NotFound`] if no row has the entity's id.
    fn update(&self, entity: &mut T) -> Result<()>;

    /// Soft-delete the live entity with this id. Returns `false` (and does
    /// nothing) if there is none.
    fn delete(&self, id: i64) -> Result<bool>;

    /// Whether a live entity with this id exists.
    fn exists(&self, id: i64) -> Result<bool>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Criteria
// ─────────────────────────────────────────────────────────────────────────────

/// A composable `WHERE` / `ORDER BY` / `LIMIT` for repository reads.
///
/// Conditions use anonymous `?` placeholders; values are bound in the order
/// the conditions were added.
#[derive(Clone, Debug, Default)]
pub struct Criteria {
    conditions: Vec<String>,
    values: Vec<Value>,
    order_by: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    include_deleted: bool,
}

impl Criteria {
    /// Empty criteria: every live row.
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.condition(format!("{column} = ?"), [value.into()])
    }

    /// Raw SQL condition with `?` placeholders for `values`.
    #[must_use]
    pub fn condition(
        mut self,
        sql: impl Into<String>,
        values: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.conditions.push(sql.into());
        self.values.extend(values);
        self
    }

    /// `ORDER BY` clause (without the keywords). Default: `id`.
    #[must_use]
    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by = Some(clause.into());
        self
    }

    /// Maximum number of rows.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Also return soft-deleted rows.
    #[must_use]
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Bound values, in placeholder order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `WHERE ...` (possibly empty) including the soft-delete filter.
    pub fn where_clause(&self) -> String {
        let mut conditions: Vec<&str> = Vec::with_capacity(self.conditions.len() + 1);
        if !self.include_deleted {
            conditions.push("is_deleted = 0");
        }
        conditions.extend(self.conditions.iter().map(String::as_str));

        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn tail_clause(&self) -> String {
        let order = self.order_by.as_deref().unwrap_or("id");
        let page = match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
            (Some(limit), None) => format!(" LIMIT {limit}"),
            (None, Some(offset)) => format!(" LIMIT -1 OFFSET {offset}"),
            (None, None) => String::new(),
        };
        format!("ORDER BY {order}{page}")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite implementation
// ─────────────────────────────────────────────────────────────────────────────

/// [`Repository`] over a borrowed `SQLite` connection.
///
/// Stateless apart from the connection; construct one per unit of work.
pub struct SqliteRepository<'c, T> {
    conn: &'c Connection,
    _entity: PhantomData<T>,
}

impl<'c, T: Entity> SqliteRepository<'c, T> {
    /// Wrap a connection.
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            _entity: PhantomData,
        }
    }

    /// The underlying connection.
    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    /// Number of rows matching `criteria` (limit/offset ignored).
    pub fn count(&self, criteria: &Criteria) -> Result<u32> {
        let sql = format!("SELECT COUNT(*) FROM {} {}", T::TABLE, criteria.where_clause());
        let total = self
            .conn
            .query_row(&sql, params_from_iter(criteria.values()), |row| row.get(0))?;
        Ok(total)
    }

    fn load(&self, id: i64, include_deleted: bool) -> Result<Option<T>> {
        let mut criteria = Criteria::new().eq("id", id).limit(1);
        if include_deleted {
            criteria = criteria.include_deleted();
        }
        Ok(self.find(&criteria)?.into_iter().next())
    }
}

impl<T: Entity> Repository<T> for SqliteRepository<'_, T> {
    fn get_by_id(&self, id: i64) -> Result<Option<T>> {
        self.load(id, false)
    }

    fn get_all(&self) -> Result<Vec<T>> {
        self.find(&Criteria::new())
    }

    fn find(&self, criteria: &Criteria) -> Result<Vec<T>> {
        let sql = format!(
            "SELECT * FROM {} {} {}",
            T::TABLE,
            criteria.where_clause(),
            criteria.tail_clause()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut items = stmt
            .query_map(params_from_iter(criteria.values()), T::from_row)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        T::load_related(self.conn, &mut items)?;
        Ok(items)
    }

    fn add(&self, entity: &T) -> Result<T> {
        let id = entity.insert(self.conn)?;
        debug!(entity = T::KIND, id, "inserted row");
        self.load(id, true)?
            .ok_or_else(|| StoreError::not_found(T::KIND, id))
    }

    fn update(&self, entity: &mut T) -> Result<()> {
        entity.touch(model::now());
        let changed = entity.write(self.conn)?;
        if changed == 0 {
            return Err(StoreError::not_found(T::KIND, entity.id()));
        }
        debug!(entity = T::KIND, id = entity.id(), "updated row");
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let Some(mut entity) = self.get_by_id(id)? else {
            return Ok(false);
        };
        entity.mark_deleted();
        self.update(&mut entity)?;
        debug!(entity = T::KIND, id, "soft-deleted row");
        Ok(true)
    }

    fn exists(&self, id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1 AND is_deleted = 0)",
            T::TABLE
        );
        let exists = self
            .conn
            .query_row(&sql, params![id], |row| row.get(0))
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Column codecs
// ─────────────────────────────────────────────────────────────────────────────

/// RFC 3339 UTC timestamp column with fixed microsecond precision.
///
/// The fixed width keeps lexicographic order equal to chronological order,
/// so range filters like `due_date < ?` work on the text column.
pub(crate) struct SqlTimestamp(pub DateTime<Utc>);

impl SqlTimestamp {
    pub(crate) fn format(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl ToSql for SqlTimestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(Self::format(self.0)))
    }
}

impl FromSql for SqlTimestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        DateTime::parse_from_rfc3339(text)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Read the `is_deleted` column.
pub(crate) fn state_from_row(row: &Row<'_>) -> rusqlite::Result<RecordState> {
    Ok(RecordState::from_deleted_flag(row.get("is_deleted")?))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
