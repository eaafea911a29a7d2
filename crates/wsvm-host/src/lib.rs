//! # wsvm Host
//!
//! Runs one WebAssembly guest against the host capability table.
//!
//! - [`memory`]: bounds-checked views over guest linear memory
//! - [`codec`]: UTF-8 and length-prefixed UTF-16 strings, pointer/size pairs
//! - [`capabilities`]: the `env` and `wasi_snapshot_preview1` imports
//! - [`driver`]: compile, instantiate and call the entry point
//! - [`events`] and [`chain`]: tokio-backed event fan-out and chain bridge
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsvm_host::prelude::*;
//!
//! let bytes = std::fs::read("guest.wasm").unwrap();
//! let mut vm = WasmVm::new(bytes, HostServices::new());
//! vm.send_event(r#"{"temperature": 21}"#);
//! match vm.start() {
//!     Ok(output) => println!("{} log lines", output.stdout.len()),
//!     Err(failure) => eprintln!("run failed: {}", failure),
//! }
//! ```

pub mod capabilities;
pub mod chain;
pub mod codec;
pub mod context;
pub mod driver;
pub mod events;
pub mod memory;
pub mod prelude;

pub use context::{HostServices, HostState, SqlBridge};
pub use driver::{ImportStatus, Outcome, RunFailure, RunOptions, RunOutput, RunState, VmError, WasmVm};
