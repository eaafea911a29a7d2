//! Per-run host state and the collaborators injected into it.

use std::sync::Arc;
use wasmtime::{Memory, TypedFunc};
use wsvm_core::chain::ChainClient;
use wsvm_core::diagnostics::{Diagnostics, EventSink, HostEvent, NullSink};
use wsvm_core::env::{EnvProvider, MapEnv};
use wsvm_core::kv::{KvStore, MemoryKv};
use wsvm_core::sql::{LiteralTranslator, RelationalEngine, SqlTranslator};
use wsvm_core::types::RunId;

/// Translator and engine behind the two SQL capabilities.
#[derive(Clone)]
pub struct SqlBridge {
    pub translator: Arc<dyn SqlTranslator>,
    pub engine: Arc<dyn RelationalEngine>,
}

/// Everything a guest can reach through its imports.
///
/// Cloning shares the underlying collaborators.
#[derive(Clone)]
pub struct HostServices {
    pub env: Arc<dyn EnvProvider>,
    pub database: Option<SqlBridge>,
    pub kv: Arc<dyn KvStore>,
    pub chain: Option<Arc<dyn ChainClient>>,
    pub events: Arc<dyn EventSink>,
}

impl Default for HostServices {
    fn default() -> Self {
        Self {
            env: Arc::new(MapEnv::new()),
            database: None,
            kv: Arc::new(MemoryKv::new()),
            chain: None,
            events: Arc::new(NullSink),
        }
    }
}

impl HostServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: Arc<dyn EnvProvider>) -> Self {
        self.env = env;
        self
    }

    pub fn with_database(
        mut self,
        translator: Arc<dyn SqlTranslator>,
        engine: Arc<dyn RelationalEngine>,
    ) -> Self {
        self.database = Some(SqlBridge { translator, engine });
        self
    }

    /// Attach `engine` with positional literal substitution for params.
    pub fn with_sql_engine(self, engine: Arc<dyn RelationalEngine>) -> Self {
        self.with_database(Arc::new(LiteralTranslator), engine)
    }

    pub fn with_kv(mut self, kv: Arc<dyn KvStore>) -> Self {
        self.kv = kv;
        self
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainClient>) -> Self {
        self.chain = Some(chain);
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }
}

impl std::fmt::Debug for HostServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostServices")
            .field("database", &self.database.is_some())
            .field("chain", &self.chain.is_some())
            .finish_non_exhaustive()
    }
}

/// Store data for one guest run.
///
/// `memory` and `alloc` are filled in after instantiation.
pub struct HostState {
    pub services: HostServices,
    pub diagnostics: Diagnostics,
    /// Payload slot written by the embedder and read by `ws_get_data`.
    pub ctx_data: String,
    pub run_id: RunId,
    pub(crate) memory: Option<Memory>,
    pub(crate) alloc: Option<TypedFunc<i32, i32>>,
}

impl HostState {
    pub fn new(services: HostServices, run_id: RunId) -> Self {
        Self {
            services,
            diagnostics: Diagnostics::new(),
            ctx_data: String::new(),
            run_id,
            memory: None,
            alloc: None,
        }
    }

    pub fn publish(&self, event: HostEvent) {
        self.services.events.publish(event);
    }
}
