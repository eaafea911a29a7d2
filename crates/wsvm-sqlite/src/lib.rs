//! # wsvm SQLite
//!
//! SQLite implementations of the wsvm storage collaborators:
//!
//! - [`SqliteEngine`]: runs the statements guests send through
//!   `ws_set_sql_db` / `ws_get_sql_db`
//! - [`SqliteKv`]: durable store behind `ws_set_db` / `ws_get_db`
//! - [`DatabaseSchema`]: JSON table definitions applied before a run
//!
//! Both stores can share one database file; each opens its own connection.

pub mod engine;
pub mod kv;
pub mod schema;

pub use engine::SqliteEngine;
pub use kv::SqliteKv;
pub use schema::{ColumnDef, DatabaseSchema, SchemaDef, TableDef};

use wsvm_core::error::CollaboratorError;

pub(crate) fn db_err(e: rusqlite::Error) -> CollaboratorError {
    CollaboratorError::Database(e.to_string())
}

pub(crate) fn lock_err() -> CollaboratorError {
    CollaboratorError::Database("connection lock poisoned".to_string())
}
