//! wsvm Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use wsvm_core::prelude::*;
//! ```

pub use crate::chain::{ChainClient, ReadCall, SendTx, StaticChain, TxCallback, TxReceipt};
pub use crate::diagnostics::{
    CollectingSink, DiagnosticRecord, Diagnostics, EventSink, HostEvent, Level, NullSink,
};
pub use crate::env::{EnvProvider, MapEnv};
pub use crate::error::{CollabResult, CollaboratorError, HostError, HostResult};
pub use crate::kv::{KvStore, MemoryKv};
pub use crate::sql::{LiteralTranslator, RelationalEngine, ResultSet, SqlQuery, SqlTranslator};
pub use crate::status::StatusCode;
pub use crate::types::RunId;
