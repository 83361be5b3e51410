//! Table store.
//!
//! A small query interface over one SQLite connection: equality filters,
//! ordering, limits, single-row fetches and counts. Rows travel as JSON
//! objects so services can insert and decode their own model types with
//! serde. Each call takes the connection lock once and is atomic on its own;
//! sequences of calls are not.

mod query;
pub mod schema;

pub use query::{decode, Direction, Query};
pub use schema::{ColumnKind, Table};

use rusqlite::Connection;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// One row, keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unknown column `{column}` on `{table}`")]
    UnknownColumn { table: &'static str, column: String },
    #[error("no matching row in `{0}`")]
    NotFound(&'static str),
    #[error("expected one row in `{table}`, found {count}")]
    MultipleRows { table: &'static str, count: usize },
    #[error("`{table}` constraint violated: {message}")]
    Constraint { table: &'static str, message: String },
    #[error("column `{column}` expects a {expected} value")]
    InvalidValue { column: String, expected: &'static str },
    #[error("refusing to {0} without a filter")]
    Unfiltered(&'static str),
    #[error("row payload must be a JSON object")]
    NotAnObject,
    #[error("cannot decode row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub(crate) fn from_sqlite(table: Table, err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, message)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint {
                    table: table.name(),
                    message: message.unwrap_or_else(|| code.to_string()),
                }
            }
            other => StoreError::Sqlite(other),
        }
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint { .. })
    }
}

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating if needed) the database at `path` and migrates it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Starts a query against `table`.
    pub fn from(&self, table: Table) -> Query<'_> {
        Query::new(self, table)
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}
