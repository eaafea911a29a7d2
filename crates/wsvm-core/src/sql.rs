//! Relational database contracts behind `ws_set_sql_db` / `ws_get_sql_db`.
//!
//! The guest sends a JSON descriptor `{"statement": "...", "params": [...]}`.
//! A [`SqlTranslator`] turns it into statement text, a [`RelationalEngine`]
//! runs that text and serializes result sets back to JSON.

use crate::error::{CollabResult, CollaboratorError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured query descriptor received from the guest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQuery {
    pub statement: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl SqlQuery {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

pub trait SqlTranslator: Send + Sync {
    fn to_statement(&self, query: &SqlQuery) -> CollabResult<String>;
}

/// Rows returned by a statement. Write statements carry no columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub rows_affected: usize,
}

impl ResultSet {
    /// Rows as objects keyed by column name.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub trait RelationalEngine: Send + Sync {
    fn execute(&self, statement: &str) -> CollabResult<ResultSet>;

    /// JSON text handed back to the guest by `ws_get_sql_db`.
    fn serialize(&self, result: &ResultSet) -> CollabResult<String> {
        Ok(serde_json::to_string(&result.to_records())?)
    }
}

/// Inlines positional `?` parameters as SQL literals.
///
/// Question marks inside quoted strings or identifiers are left alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralTranslator;

impl LiteralTranslator {
    pub fn literal(value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => quote(s),
            other => quote(&other.to_string()),
        }
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

impl SqlTranslator for LiteralTranslator {
    fn to_statement(&self, query: &SqlQuery) -> CollabResult<String> {
        let mut out = String::with_capacity(query.statement.len());
        let mut params = query.params.iter();
        let mut quote_char: Option<char> = None;
        let mut used = 0usize;

        for ch in query.statement.chars() {
            match (quote_char, ch) {
                (None, '\'') | (None, '"') => {
                    quote_char = Some(ch);
                    out.push(ch);
                }
                (Some(open), c) if c == open => {
                    quote_char = None;
                    out.push(ch);
                }
                (None, '?') => {
                    let value = params.next().ok_or_else(|| {
                        CollaboratorError::Translation(format!(
                            "statement has more placeholders than the {} params given",
                            query.params.len()
                        ))
                    })?;
                    used += 1;
                    out.push_str(&Self::literal(value));
                }
                _ => out.push(ch),
            }
        }

        if used != query.params.len() {
            return Err(CollaboratorError::Translation(format!(
                "statement uses {} placeholders but {} params were given",
                used,
                query.params.len()
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_guest_descriptor() {
        let q = SqlQuery::parse(r#"{"statement":"SELECT 1","params":[]}"#).unwrap();
        assert_eq!(q.statement, "SELECT 1");
        let q = SqlQuery::parse(r#"{"statement":"SELECT 2"}"#).unwrap();
        assert!(q.params.is_empty());
        assert!(SqlQuery::parse("not json").is_err());
    }

    #[test]
    fn inlines_params_in_order() {
        let q = SqlQuery::new(r#"INSERT INTO "t_log" (f_id,f_log,f_ok,f_none) VALUES (?,?,?,?);"#)
            .with_params(vec![json!(7), json!("it's"), json!(true), Value::Null]);
        let stmt = LiteralTranslator.to_statement(&q).unwrap();
        assert_eq!(
            stmt,
            r#"INSERT INTO "t_log" (f_id,f_log,f_ok,f_none) VALUES (7,'it''s',1,NULL);"#
        );
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        let q = SqlQuery::new("SELECT '?' AS q, ? AS v").with_params(vec![json!(1.5)]);
        assert_eq!(
            LiteralTranslator.to_statement(&q).unwrap(),
            "SELECT '?' AS q, 1.5 AS v"
        );
    }

    #[test]
    fn placeholder_count_must_match() {
        let too_few = SqlQuery::new("SELECT ?, ?").with_params(vec![json!(1)]);
        assert!(LiteralTranslator.to_statement(&too_few).is_err());
        let too_many = SqlQuery::new("SELECT ?").with_params(vec![json!(1), json!(2)]);
        assert!(LiteralTranslator.to_statement(&too_many).is_err());
    }

    #[test]
    fn nested_values_become_json_text() {
        assert_eq!(LiteralTranslator::literal(&json!({"a": 1})), r#"'{"a":1}'"#);
    }

    #[test]
    fn records_pair_columns_with_values() {
        let rs = ResultSet {
            columns: vec!["id".into(), "name".into()],
            rows: vec![vec![json!(1), json!("a")], vec![json!(2), json!("b")]],
            rows_affected: 0,
        };
        struct Noop;
        impl RelationalEngine for Noop {
            fn execute(&self, _: &str) -> CollabResult<ResultSet> {
                Ok(ResultSet::default())
            }
        }
        assert_eq!(
            Noop.serialize(&rs).unwrap(),
            r#"[{"id":1,"name":"a"},{"id":2,"name":"b"}]"#
        );
    }
}
