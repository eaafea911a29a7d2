//! Common imports for embedding the host.
//!
//! ```rust
//! use wsvm_host::prelude::*;
//! ```

pub use crate::chain::{AsyncChainClient, ChainBackend};
pub use crate::codec::HostValue;
pub use crate::context::{HostServices, SqlBridge};
pub use crate::driver::{
    ImportStatus, Outcome, RunFailure, RunOptions, RunOutput, RunState, VmError, WasmVm,
};
pub use crate::events::BroadcastSink;
pub use wsvm_core::prelude::*;
