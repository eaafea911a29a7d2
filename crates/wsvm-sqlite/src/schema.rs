//! Table definitions applied to the database before a guest runs.
//!
//! Same JSON shape the studio keeps in a project's database file:
//!
//! ```json
//! {"schemas": [{"schemaName": "public", "tables": [
//!     {"tableName": "t_log", "columns": [
//!         {"name": "f_id", "type": "INTEGER", "primaryKey": true},
//!         {"name": "f_log", "type": "TEXT"}
//!     ]}
//! ]}]}
//! ```

use serde::{Deserialize, Serialize};
use wsvm_core::error::{CollabResult, CollaboratorError};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub schemas: Vec<SchemaDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    #[serde(rename = "schemaName", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(rename = "tableName")]
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type", default = "default_column_type")]
    pub sql_type: String,
    #[serde(rename = "primaryKey", default)]
    pub primary_key: bool,
    #[serde(rename = "notNull", default)]
    pub not_null: bool,
}

fn default_column_type() -> String {
    "TEXT".to_string()
}

impl DatabaseSchema {
    pub fn from_json(text: &str) -> CollabResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.schemas.iter().flat_map(|s| s.tables.iter())
    }

    pub fn create_statements(&self) -> CollabResult<Vec<String>> {
        self.tables().map(TableDef::create_statement).collect()
    }
}

impl TableDef {
    pub fn create_statement(&self) -> CollabResult<String> {
        if self.columns.is_empty() {
            return Err(CollaboratorError::Database(format!(
                "table {} has no columns",
                self.name
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(ColumnDef::definition)
            .collect::<CollabResult<Vec<_>>>()?;
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(&self.name),
            columns.join(", ")
        ))
    }
}

impl ColumnDef {
    fn definition(&self) -> CollabResult<String> {
        let valid_type = !self.sql_type.trim().is_empty()
            && self
                .sql_type
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '(' | ')' | ',' | '_'));
        if !valid_type {
            return Err(CollaboratorError::Database(format!(
                "invalid type {:?} for column {}",
                self.sql_type, self.name
            )));
        }
        let mut def = format!("{} {}", quote_ident(&self.name), self.sql_type.trim());
        if self.primary_key {
            def.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            def.push_str(" NOT NULL");
        }
        Ok(def)
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
