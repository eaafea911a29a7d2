//! SQLite implementation of the relational engine collaborator.

use crate::schema::{quote_ident, DatabaseSchema};
use crate::{db_err, lock_err};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Result as SqlResult};
use serde_json::{Number, Value};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use wsvm_core::error::CollabResult;
use wsvm_core::sql::{RelationalEngine, ResultSet};

/// Relational engine over a single SQLite connection.
///
/// Supports both in-memory and file-backed databases.
pub struct SqliteEngine {
    conn: Mutex<Connection>,
}

impl SqliteEngine {
    /// Create a new in-memory database.
    pub fn new_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// Create or open a file-backed database.
    pub fn open<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Create every table described by `schema` that does not exist yet.
    pub fn apply_schema(&self, schema: &DatabaseSchema) -> CollabResult<usize> {
        let statements = schema.create_statements()?;
        let conn = self.conn.lock().map_err(|_| lock_err())?;
        for stmt in &statements {
            debug!(statement = %stmt, "applying schema");
            conn.execute_batch(stmt).map_err(db_err)?;
        }
        Ok(statements.len())
    }

    /// Every row of `table`, for inspection after a run.
    pub fn snapshot(&self, table: &str) -> CollabResult<ResultSet> {
        self.execute(&format!("SELECT * FROM {}", quote_ident(table)))
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
    }
}

impl RelationalEngine for SqliteEngine {
    fn execute(&self, statement: &str) -> CollabResult<ResultSet> {
        let conn = self.conn.lock().map_err(|_| lock_err())?;
        let mut stmt = conn.prepare(statement).map_err(db_err)?;

        if stmt.column_count() == 0 {
            let rows_affected = stmt.execute([]).map_err(db_err)?;
            debug!(rows_affected, "statement executed");
            return Ok(ResultSet {
                rows_affected,
                ..ResultSet::default()
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.query([]).map_err(db_err)?;
        while let Some(row) = cursor.next().map_err(db_err)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_json(row.get_ref(i).map_err(db_err)?));
            }
            rows.push(values);
        }
        debug!(rows = rows.len(), "query executed");

        Ok(ResultSet {
            columns,
            rows,
            rows_affected: 0,
        })
    }
}

impl std::fmt::Debug for SqliteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteEngine").finish_non_exhaustive()
    }
}

impl From<Connection> for SqliteEngine {
    fn from(conn: Connection) -> Self {
        Self::from_connection(conn)
    }
}
