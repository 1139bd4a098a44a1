//! Statement execution.
//!
//! [`Driver`] is the narrow contract the persistence layer needs from a
//! store: run a statement, fetch rows, report the last assigned key.
//! [`SqliteDriver`] implements it on a single `rusqlite` connection, which it
//! owns and closes on drop.

use std::path::Path;

use ormlet_core::Value;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use rusqlite::types::Value as SqlValue;
use tracing::debug;

use crate::convert;
use crate::error::Result;

/// A raw result row, one value per selected column.
pub type Row = Vec<Value>;

/// Executes SQL on behalf of a [`Database`](crate::Database).
///
/// Parameters are positional (`?1`, `?2`, ...) and given as storage values.
pub trait Driver {
    /// Executes a statement and returns the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Runs a query and returns every row.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Executes several `;`-separated statements without parameters.
    fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Key assigned by the most recent successful insert.
    fn last_insert_id(&self) -> i64;

    fn table_exists(&self, table: &str) -> Result<bool>;
}

/// [`Driver`] over one SQLite connection.
///
/// Foreign key enforcement is switched on when the driver is created.
///
/// # Examples
///
/// ```
/// use ormlet_sqlite::{Driver, SqliteDriver};
///
/// let driver = SqliteDriver::open_in_memory().unwrap();
/// driver.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)").unwrap();
/// assert!(driver.table_exists("t").unwrap());
/// assert!(!driver.table_exists("missing").unwrap());
/// ```
#[derive(Debug)]
pub struct SqliteDriver {
    conn: Connection,
}

impl SqliteDriver {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }
}

impl Driver for SqliteDriver {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, params = params.len(), "executing statement");
        let bound: Vec<SqlValue> = params.iter().map(convert::to_sql).collect();
        Ok(self.conn.execute(sql, params_from_iter(bound.iter()))?)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(sql, params = params.len(), "running query");
        let bound: Vec<SqlValue> = params.iter().map(convert::to_sql).collect();
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();

        let raw_rows = stmt
            .query_map(params_from_iter(bound.iter()), |row| {
                (0..column_count)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw_rows
            .into_iter()
            .map(|row| row.into_iter().map(convert::from_sql).collect())
            .collect()
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        debug!(sql, "executing batch");
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
