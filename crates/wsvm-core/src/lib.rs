//! # wsvm Core
//!
//! Shared types for the wsvm WebAssembly host runtime.
//!
//! This crate has no engine dependency. It defines what crosses the
//! host/guest boundary and what the host talks to on the other side:
//!
//! - **StatusCode**: the closed set of `i32` results every capability returns
//! - **RunId**: the per-run identifier handed to the guest entry point
//! - **Diagnostics**: append-only `stdout`/`stderr` record sequences
//! - **HostEvent / EventSink**: out-of-band events for real-time consumers
//! - **Collaborators**: env lookup, SQL translation and execution,
//!   key/value storage, chain reads and transaction dispatch
//!
//! ## Quick Start
//!
//! ```rust
//! use wsvm_core::prelude::*;
//!
//! let env = MapEnv::new().with_var("API_URL", "http://localhost:8888");
//! assert_eq!(env.lookup("API_URL").as_deref(), Some("http://localhost:8888"));
//!
//! let id = RunId::from_seed(42);
//! assert_eq!(id.as_i32(), 42);
//! ```

pub mod chain;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod kv;
pub mod prelude;
pub mod sql;
pub mod status;
pub mod types;
