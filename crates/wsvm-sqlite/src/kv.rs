//! SQLite-backed durable key/value store.

use crate::{db_err, lock_err};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::Mutex;
use wsvm_core::error::CollabResult;
use wsvm_core::kv::KvStore;

/// Key/value store kept in a `kv_store` table.
pub struct SqliteKv {
    conn: Mutex<Connection>,
}

impl SqliteKv {
    pub fn new_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> SqlResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn len(&self) -> CollabResult<usize> {
        let conn = self.conn.lock().map_err(|_| lock_err())?;
        conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
            .map_err(db_err)
    }
}

impl KvStore for SqliteKv {
    fn set(&self, key: &str, value: &str) -> CollabResult<()> {
        let conn = self.conn.lock().map_err(|_| lock_err())?;
        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn get(&self, key: &str) -> CollabResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| lock_err())?;
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)
    }
}
