mod common;

use common::{data, guest, lenient, messages, LOG, LOG_OUTPUT};
use std::sync::Arc;
use wsvm_host::prelude::*;

#[test]
fn hello_log() {
    let (hello, len) = data(16, "hello");
    let body = format!("(drop (call $ws_log (i32.const 0) (i32.const 16) (i32.const {})))", len);
    let mut vm = WasmVm::new(guest(&[LOG], &[&hello], &body), HostServices::new());

    let output = vm.start().unwrap();
    assert_eq!(messages(&output.stdout), ["hello"]);
    assert!(output.stderr.is_empty());
    assert_eq!(output.state, RunState::Finished(Outcome::Ok));
    assert_eq!(vm.state(), RunState::Finished(Outcome::Ok));
}

#[test]
fn entry_may_return_status() {
    let wat = format!(
        r#"(module {} {}
          (func (export "start") (param i32) (result i32)
            (call $ws_log (i32.const 0) (i32.const 0) (i32.const 0))))"#,
        LOG,
        common::RUNTIME
    );
    let mut vm = WasmVm::new(wat::parse_str(&wat).unwrap(), HostServices::new());
    let output = vm.start().unwrap();
    assert_eq!(messages(&output.stdout), [""]);
}

const GET_ENV: &str = r#"(import "env" "ws_get_env" (func $ws_get_env (param i32 i32 i32 i32) (result i32)))"#;

fn env_guest() -> Vec<u8> {
    let (key, len) = data(32, "API_URL");
    let body = format!(
        "(if (i32.eqz (call $ws_get_env (i32.const 32) (i32.const {}) (i32.const 8) (i32.const 12)))
           (then {}))",
        len, LOG_OUTPUT
    );
    guest(&[LOG, GET_ENV], &[&key], &body)
}

#[test]
fn env_hit_reaches_guest() {
    let env = MapEnv::new().with_var("API_URL", "http://localhost:8888");
    let services = HostServices::new().with_env(Arc::new(env));
    let output = WasmVm::new(env_guest(), services).start().unwrap();
    assert_eq!(messages(&output.stdout), ["http://localhost:8888"]);
    assert!(output.stderr.is_empty());
}

#[test]
fn env_miss_is_diagnosed_not_fatal() {
    let output = WasmVm::new(env_guest(), HostServices::new()).start().unwrap();
    assert!(output.stdout.is_empty());
    assert_eq!(messages(&output.stderr), ["env key not found: API_URL"]);
    assert!(output.is_ok());
}

#[test]
fn payload_slot_round_trip() {
    let import = r#"(import "env" "ws_get_data" (func $ws_get_data (param i32 i32 i32) (result i32)))"#;
    let body = format!(
        "(if (i32.eqz (call $ws_get_data (local.get $rid) (i32.const 8) (i32.const 12))) (then {}))",
        LOG_OUTPUT
    );
    let mut vm = WasmVm::new(guest(&[LOG, import], &[], &body), HostServices::new());
    vm.send_event(r#"{"temperature":21}"#);
    let output = vm.start().unwrap();
    assert_eq!(messages(&output.stdout), [r#"{"temperature":21}"#]);
}

#[test]
fn kv_round_trip() {
    let set = r#"(import "env" "ws_set_db" (func $ws_set_db (param i32 i32 i32 i32) (result i32)))"#;
    let get = r#"(import "env" "ws_get_db" (func $ws_get_db (param i32 i32 i32 i32) (result i32)))"#;
    let (key, klen) = data(32, "device");
    let (value, vlen) = data(64, "online");
    let body = format!(
        "(drop (call $ws_set_db (i32.const 32) (i32.const {k}) (i32.const 64) (i32.const {v})))
         (if (i32.eqz (call $ws_get_db (i32.const 32) (i32.const {k}) (i32.const 8) (i32.const 12)))
           (then {log}))",
        k = klen,
        v = vlen,
        log = LOG_OUTPUT
    );
    let kv = Arc::new(MemoryKv::new());
    let services = HostServices::new().with_kv(kv.clone());
    let output = WasmVm::new(guest(&[LOG, set, get], &[&key, &value], &body), services)
        .start()
        .unwrap();

    assert_eq!(
        messages(&output.stdout),
        ["call ws_set_db device: online", "call ws_get_db device: online", "online"]
    );
    assert_eq!(kv.get("device").unwrap().as_deref(), Some("online"));
}

#[test]
fn abort_message_then_trap() {
    let import = r#"(import "env" "abort" (func $abort (param i32 i32 i32 i32)))"#;
    // Byte length 10 at 24, "boom!" as UTF-16LE at 28.
    let segment = r#"(data (i32.const 24) "\0a\00\00\00b\00o\00o\00m\00!\00")"#;
    let body = "(call $abort (i32.const 28) (i32.const 0) (i32.const 3) (i32.const 7)) unreachable";
    let output = WasmVm::new(guest(&[import], &[segment], body), HostServices::new())
        .with_options(lenient())
        .start()
        .unwrap();

    assert_eq!(messages(&output.stdout), ["boom!"]);
    assert_eq!(output.stderr.len(), 1);
    assert!(output.stderr[0].message.starts_with("guest trapped"));
    assert_eq!(output.state, RunState::Finished(Outcome::Errored));
}

#[test]
fn wasi_stubs_link_and_succeed() {
    let imports = [
        r#"(import "wasi_snapshot_preview1" "fd_write" (func $fd_write (param i32 i32 i32 i32) (result i32)))"#,
        r#"(import "wasi_snapshot_preview1" "clock_time_get" (func $clock (param i32 i64 i32) (result i32)))"#,
        r#"(import "wasi_snapshot_preview1" "proc_exit" (func $proc_exit (param i32)))"#,
        LOG,
    ];
    let (ok, len) = data(16, "ok");
    let body = format!(
        "(if (i32.eqz (i32.add
               (call $fd_write (i32.const 1) (i32.const 0) (i32.const 0) (i32.const 0))
               (call $clock (i32.const 0) (i64.const 1000) (i32.const 0))))
           (then (drop (call $ws_log (i32.const 0) (i32.const 16) (i32.const {})))))
         (call $proc_exit (i32.const 0))",
        len
    );
    let output = WasmVm::new(guest(&imports, &[&ok], &body), HostServices::new())
        .start()
        .unwrap();
    assert_eq!(messages(&output.stdout), ["ok"]);
}

#[test]
fn mqtt_placeholder_reports_unsupported() {
    let import = r#"(import "env" "ws_send_mqtt_msg" (func $mqtt (param i32 i32 i32 i32) (result i32)))"#;
    let body = "(drop (call $mqtt (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0)))";
    let output = WasmVm::new(guest(&[import], &[], body), HostServices::new())
        .start()
        .unwrap();
    assert_eq!(messages(&output.stderr), ["ws_send_mqtt_msg is not supported"]);
    assert!(output.is_ok());
}

fn hello_guest() -> Vec<u8> {
    guest(&[LOG], &[], "(drop (call $ws_log (i32.const 0) (i32.const 0) (i32.const 0)))")
}

#[test]
fn missing_entry_throws() {
    let options = RunOptions {
        entry: "main".into(),
        ..RunOptions::default()
    };
    let failure = WasmVm::new(hello_guest(), HostServices::new())
        .with_options(options)
        .start()
        .unwrap_err();

    assert!(matches!(
        &failure.error,
        VmError::EntryPoint { name, .. } if name == "main"
    ));
    assert_eq!(failure.output.stderr.len(), 1);
    assert_eq!(failure.output.stderr[0].message, "entry point `main` is not exported");
    assert_eq!(failure.output.state, RunState::Finished(Outcome::Errored));
}

#[test]
fn missing_entry_without_throw() {
    let options = RunOptions {
        entry: "main".into(),
        throw_error: false,
    };
    let output = WasmVm::new(hello_guest(), HostServices::new())
        .with_options(options)
        .start()
        .unwrap();
    assert_eq!(output.state, RunState::Finished(Outcome::Errored));
    assert_eq!(output.stderr.len(), 1);
    assert!(output.stdout.is_empty());
}

#[test]
fn entry_with_wrong_signature() {
    let wat = format!(
        r#"(module {} (func (export "start") (param i32 i32)))"#,
        common::RUNTIME
    );
    let failure = WasmVm::new(wat::parse_str(&wat).unwrap(), HostServices::new())
        .start()
        .unwrap_err();
    assert!(matches!(failure.error, VmError::EntryPoint { .. }));
}

#[test]
fn compile_error_is_reported() {
    let failure = WasmVm::new(b"definitely not wasm".to_vec(), HostServices::new())
        .start()
        .unwrap_err();
    assert!(matches!(failure.error, VmError::Compile(_)));
    assert_eq!(failure.output.stderr.len(), 1);
}

#[test]
fn memory_export_is_required() {
    let bytes = wat::parse_str(r#"(module (func (export "start") (param i32)))"#).unwrap();
    let failure = WasmVm::new(bytes, HostServices::new()).start().unwrap_err();
    assert_eq!(failure.error, VmError::MissingExport("memory".into()));
}

#[test]
fn unknown_import_fails_instantiation() {
    let import = r#"(import "env" "ws_teleport" (func (param i32) (result i32)))"#;
    let bytes = guest(&[import, LOG], &[], "");
    let mut vm = WasmVm::new(bytes, HostServices::new());

    let imports = vm.imports().unwrap();
    let status: Vec<_> = imports
        .iter()
        .map(|i| (i.name.as_str(), i.provided))
        .collect();
    assert_eq!(status, [("ws_teleport", false), ("ws_log", true)]);

    let failure = vm.start().unwrap_err();
    assert!(matches!(failure.error, VmError::Instantiate(_)));
}

#[test]
fn second_start_is_rejected() {
    let mut vm = WasmVm::new(hello_guest(), HostServices::new());
    let first = vm.start().unwrap();
    let failure = vm.start().unwrap_err();
    assert_eq!(failure.error, VmError::AlreadyStarted);
    assert_eq!(failure.output.stdout.len(), first.stdout.len());
    assert!(failure.output.stderr.is_empty());
}

#[test]
fn run_id_reaches_entry_point() {
    let (in_range, len) = data(64, "in range");
    let body = format!(
        "(if (i32.lt_u (local.get $rid) (i32.const {}))
           (then (drop (call $ws_log (i32.const 0) (i32.const 64) (i32.const {})))))",
        RunId::LIMIT,
        len
    );
    let mut vm = WasmVm::new(guest(&[LOG], &[&in_range], &body), HostServices::new());
    let before = vm.run_id();
    let output = vm.start().unwrap();
    assert_eq!(messages(&output.stdout), ["in range"]);
    assert_eq!(vm.run_id(), before);
}
