//! `ws_set_sql_db` / `ws_get_sql_db`: JSON SQL commands from the guest.

use super::{arity_mismatch, copy_out, finish, read_string, HostCall};
use crate::context::SqlBridge;
use tracing::{debug, warn};
use wsvm_core::diagnostics::HostEvent;
use wsvm_core::error::HostError;
use wsvm_core::sql::SqlQuery;
use wsvm_core::status::StatusCode;

pub(super) fn ws_set_sql_db(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[ptr, len] = args else {
        return arity_mismatch("ws_set_sql_db", args);
    };
    let result = prepare(call, ptr, len).and_then(|(bridge, statement)| {
        run(call, &bridge, &statement)?;
        call.state()
            .diagnostics
            .push_stdout(format!("run sql {}", statement));
        call.state().publish(HostEvent::SqlChanged);
        Ok(())
    });
    settle(call, "ws_set_sql_db", result)
}

pub(super) fn ws_get_sql_db(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[ptr, len, out_addr, out_size] = args else {
        return arity_mismatch("ws_get_sql_db", args);
    };
    let result = prepare(call, ptr, len).and_then(|(bridge, statement)| {
        let json = run(call, &bridge, &statement)?;
        copy_out(call, json, out_addr, out_size)?;
        Ok(())
    });
    settle(call, "ws_get_sql_db", result)
}

/// A failed SQL call. `Reported` errors already have their stderr line.
enum SqlFailure {
    Reported(HostError),
    Host(HostError),
}

impl From<HostError> for SqlFailure {
    fn from(err: HostError) -> Self {
        SqlFailure::Host(err)
    }
}

fn settle(call: &mut dyn HostCall, capability: &str, result: Result<(), SqlFailure>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::Ok,
        Err(SqlFailure::Reported(err)) => {
            warn!(capability, error = %err, "sql call failed");
            err.status()
        }
        Err(SqlFailure::Host(err)) => finish(call, capability, Err(err)),
    }
}

/// Decodes and translates the guest command into a statement.
fn prepare(call: &mut dyn HostCall, ptr: i32, len: i32) -> Result<(SqlBridge, String), SqlFailure> {
    let text = read_string(call, ptr, len)?;
    let query = match SqlQuery::parse(&text) {
        Ok(query) => query,
        Err(e) => {
            call.state()
                .diagnostics
                .push_stderr(format!("sql parse error: {}", text));
            return Err(SqlFailure::Reported(HostError::MalformedCommand(
                e.to_string(),
            )));
        }
    };
    let bridge = call
        .state()
        .services
        .database
        .clone()
        .ok_or(HostError::NoDatabase)?;
    let statement = bridge.translator.to_statement(&query).map_err(|e| {
        call.state()
            .diagnostics
            .push_stderr(format!("sql run error: {}", e));
        SqlFailure::Reported(HostError::from(e))
    })?;
    debug!(statement = %statement, "sql command");
    Ok((bridge, statement))
}

/// Executes `statement` and returns the serialized rows.
fn run(call: &mut dyn HostCall, bridge: &SqlBridge, statement: &str) -> Result<String, SqlFailure> {
    let outcome = bridge
        .engine
        .execute(statement)
        .and_then(|rows| bridge.engine.serialize(&rows));
    outcome.map_err(|e| {
        call.state()
            .diagnostics
            .push_stderr(format!("sql run error: {}", e));
        SqlFailure::Reported(HostError::from(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::harness::TestCall;
    use crate::context::HostServices;
    use std::sync::{Arc, Mutex};
    use wsvm_core::diagnostics::CollectingSink;
    use wsvm_core::error::{CollabResult, CollaboratorError};
    use wsvm_core::sql::{RelationalEngine, ResultSet};

    /// Records statements; answers queries with one fixed row.
    #[derive(Default)]
    struct RecordingEngine {
        statements: Mutex<Vec<String>>,
    }

    impl RelationalEngine for RecordingEngine {
        fn execute(&self, statement: &str) -> CollabResult<ResultSet> {
            if statement.contains("broken") {
                return Err(CollaboratorError::Database("near \"broken\": syntax error".into()));
            }
            self.statements.lock().unwrap().push(statement.to_string());
            if statement.starts_with("SELECT") {
                Ok(ResultSet {
                    columns: vec!["f_id".into()],
                    rows: vec![vec![serde_json::json!(1)]],
                    rows_affected: 0,
                })
            } else {
                Ok(ResultSet {
                    rows_affected: 1,
                    ..ResultSet::default()
                })
            }
        }
    }

    fn setup() -> (TestCall, Arc<RecordingEngine>, Arc<CollectingSink>) {
        let engine = Arc::new(RecordingEngine::default());
        let sink = Arc::new(CollectingSink::new());
        let services = HostServices::new()
            .with_sql_engine(engine.clone())
            .with_events(sink.clone());
        (TestCall::new(services), engine, sink)
    }

    #[test]
    fn write_logs_and_publishes() {
        let (mut call, engine, sink) = setup();
        let cmd = br#"{"statement":"INSERT INTO t_log (f_id,f_log) VALUES (?,?);","params":[1,"hi"]}"#;
        let (ptr, len) = call.put(64, cmd);

        assert_eq!(ws_set_sql_db(&mut call, &[ptr, len]), StatusCode::Ok);
        let stmt = "INSERT INTO t_log (f_id,f_log) VALUES (1,'hi');";
        assert_eq!(engine.statements.lock().unwrap().as_slice(), [stmt]);
        assert_eq!(call.stdout(), [format!("run sql {}", stmt)]);
        assert_eq!(sink.events(), vec![HostEvent::SqlChanged]);
    }

    #[test]
    fn read_copies_json_rows() {
        let (mut call, _, sink) = setup();
        let (ptr, len) = call.put(64, br#"{"statement":"SELECT f_id FROM t_log"}"#);
        assert_eq!(ws_get_sql_db(&mut call, &[ptr, len, 16, 20]), StatusCode::Ok);
        assert_eq!(call.output(16, 20), br#"[{"f_id":1}]"#);
        assert!(sink.events().is_empty());
        assert!(call.stdout().is_empty());
    }

    #[test]
    fn malformed_command() {
        let (mut call, engine, _) = setup();
        let (ptr, len) = call.put(64, b"not json");
        assert_eq!(
            ws_set_sql_db(&mut call, &[ptr, len]),
            StatusCode::TransDataFromVMFailed
        );
        assert_eq!(call.stderr(), ["sql parse error: not json"]);
        assert!(engine.statements.lock().unwrap().is_empty());
    }

    #[test]
    fn execution_error() {
        let (mut call, _, sink) = setup();
        let (ptr, len) = call.put(64, br#"{"statement":"UPDATE broken"}"#);
        assert_eq!(ws_set_sql_db(&mut call, &[ptr, len]), StatusCode::ImportCallFailed);
        assert_eq!(call.stderr().len(), 1);
        assert!(call.stderr()[0].starts_with("sql run error: "));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn no_database_attached() {
        let mut call = TestCall::new(HostServices::new());
        let (ptr, len) = call.put(64, br#"{"statement":"SELECT 1"}"#);
        assert_eq!(ws_get_sql_db(&mut call, &[ptr, len, 16, 20]), StatusCode::NoDBContext);
        assert_eq!(call.stderr(), ["ws_get_sql_db: no database attached"]);
    }

    #[test]
    fn rows_that_do_not_fit_are_reported_once() {
        let (mut call, _, _) = setup();
        let (ptr, len) = call.put(64, br#"{"statement":"SELECT f_id FROM t_log"}"#);
        let before = call.heap.bytes().to_vec();
        assert_eq!(
            ws_get_sql_db(&mut call, &[ptr, len, 8190, 20]),
            StatusCode::HostInternal
        );
        assert_eq!(call.heap.bytes(), before.as_slice());
        assert_eq!(call.stderr().len(), 1);
        assert!(call.stderr()[0].starts_with("ws_get_sql_db: "));
    }
}
