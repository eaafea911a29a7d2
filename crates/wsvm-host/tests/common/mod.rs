//! Guest modules assembled from WAT fragments.

#![allow(dead_code)]

use wsvm_host::prelude::*;

/// Bump allocator starting at 4096, plus one page of exported memory.
pub const RUNTIME: &str = r#"
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 4096))
  (func (export "alloc") (param $len i32) (result i32)
    (local $ptr i32)
    (local.set $ptr (global.get $heap))
    (global.set $heap (i32.add (global.get $heap) (local.get $len)))
    (local.get $ptr))
"#;

pub const LOG: &str =
    r#"(import "env" "ws_log" (func $ws_log (param i32 i32 i32) (result i32)))"#;

/// Logs the value announced through the pair at 8/12.
pub const LOG_OUTPUT: &str =
    "(drop (call $ws_log (i32.const 0) (i32.load (i32.const 8)) (i32.load (i32.const 12))))";

/// A data segment holding `text` at `offset`, and its byte length.
pub fn data(offset: u32, text: &str) -> (String, usize) {
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    (
        format!("(data (i32.const {}) \"{}\")", offset, escaped),
        text.len(),
    )
}

/// Assembles a module from imports, extra items and the exported `start`.
pub fn guest(imports: &[&str], items: &[&str], start_body: &str) -> Vec<u8> {
    let wat = format!(
        "(module\n{}\n{}\n{}\n(func (export \"start\") (param $rid i32)\n{}))",
        imports.join("\n"),
        RUNTIME,
        items.join("\n"),
        start_body
    );
    wat::parse_str(&wat).unwrap_or_else(|e| panic!("bad test module: {}\n{}", e, wat))
}

pub fn messages(records: &[DiagnosticRecord]) -> Vec<String> {
    records.iter().map(|r| r.message.clone()).collect()
}

pub fn lenient() -> RunOptions {
    RunOptions {
        throw_error: false,
        ..RunOptions::default()
    }
}
