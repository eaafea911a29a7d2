//! The execution driver: one [`WasmVm`] per guest run.
//!
//! ```text
//! Created → Compiled → Instantiated → Running → Finished(Ok | Errored)
//! ```
//!
//! Any failure along the way is appended to `stderr` and ends the run in
//! `Finished(Errored)`. Diagnostics are returned either way.

use crate::capabilities;
use crate::context::{HostServices, HostState};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wasmtime::{Engine, Linker, Module, Store, Val, ValType};
use wsvm_core::diagnostics::{DiagnosticRecord, Diagnostics};
use wsvm_core::types::RunId;

pub const DEFAULT_ENTRY: &str = "start";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Created,
    Compiled,
    Instantiated,
    Running,
    Finished(Outcome),
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunState::Finished(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Exported function called with the run id.
    pub entry: String,
    /// Return failures as `Err` rather than inside `Ok`.
    pub throw_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            entry: DEFAULT_ENTRY.to_string(),
            throw_error: true,
        }
    }
}

/// Diagnostics of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    pub stdout: Vec<DiagnosticRecord>,
    pub stderr: Vec<DiagnosticRecord>,
    pub state: RunState,
}

impl RunOutput {
    pub fn is_ok(&self) -> bool {
        self.state == RunState::Finished(Outcome::Ok)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("compile error: {0}")]
    Compile(String),

    #[error("instantiate error: {0}")]
    Instantiate(String),

    #[error("link error: {0}")]
    Link(String),

    #[error("missing export: {0}")]
    MissingExport(String),

    #[error("entry point `{name}` {reason}")]
    EntryPoint { name: String, reason: String },

    #[error("guest trapped: {0}")]
    Trap(String),

    #[error("run already started")]
    AlreadyStarted,
}

/// A failed run, with the diagnostics gathered up to the failure.
#[derive(Error, Debug, Clone)]
#[error("{error}")]
pub struct RunFailure {
    pub error: VmError,
    pub output: RunOutput,
}

/// One module import and whether the host provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub module: String,
    pub name: String,
    pub provided: bool,
}

/// Execution context for a single guest module.
pub struct WasmVm {
    bytes: Vec<u8>,
    engine: Engine,
    store: Store<HostState>,
    options: RunOptions,
    state: RunState,
}

impl WasmVm {
    pub fn new(bytes: impl Into<Vec<u8>>, services: HostServices) -> Self {
        let engine = Engine::default();
        let run_id = RunId::new();
        let store = Store::new(&engine, HostState::new(services, run_id));
        debug!(run_id = %run_id, "execution context created");
        Self {
            bytes: bytes.into(),
            engine,
            store,
            options: RunOptions::default(),
            state: RunState::Created,
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the payload the guest reads back through `ws_get_data`.
    pub fn send_event(&mut self, data: impl Into<String>) {
        self.store.data_mut().ctx_data = data.into();
    }

    pub fn run_id(&self) -> RunId {
        self.store.data().run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.store.data().diagnostics
    }

    fn output(&self) -> RunOutput {
        let diagnostics = self.diagnostics();
        RunOutput {
            stdout: diagnostics.stdout().to_vec(),
            stderr: diagnostics.stderr().to_vec(),
            state: self.state,
        }
    }

    /// Runs the guest once.
    pub fn start(&mut self) -> Result<RunOutput, RunFailure> {
        if self.state != RunState::Created {
            return Err(RunFailure {
                error: VmError::AlreadyStarted,
                output: self.output(),
            });
        }

        let run_id = self.run_id();
        match self.execute() {
            Ok(()) => {
                self.state = RunState::Finished(Outcome::Ok);
                info!(run_id = %run_id, entry = %self.options.entry, "guest run finished");
                Ok(self.output())
            }
            Err(err) => {
                error!(run_id = %run_id, error = %err, "guest run failed");
                self.store.data_mut().diagnostics.push_stderr(err.to_string());
                self.state = RunState::Finished(Outcome::Errored);
                let output = self.output();
                if self.options.throw_error {
                    Err(RunFailure { error: err, output })
                } else {
                    Ok(output)
                }
            }
        }
    }

    fn compile(&self) -> Result<Module, VmError> {
        Module::new(&self.engine, &self.bytes).map_err(|e| VmError::Compile(format!("{:#}", e)))
    }

    fn execute(&mut self) -> Result<(), VmError> {
        let module = self.compile()?;
        self.state = RunState::Compiled;

        let mut linker = Linker::new(&self.engine);
        capabilities::bind(&mut linker, &self.engine)
            .map_err(|e| VmError::Link(format!("{:#}", e)))?;
        let instance = linker
            .instantiate(&mut self.store, &module)
            .map_err(|e| VmError::Instantiate(format!("{:#}", e)))?;

        let memory = instance
            .get_memory(&mut self.store, "memory")
            .ok_or_else(|| VmError::MissingExport("memory".to_string()))?;
        let alloc = instance
            .get_typed_func::<i32, i32>(&mut self.store, "alloc")
            .ok();
        if alloc.is_none() {
            warn!("guest exports no `alloc(i32) -> i32`; host values cannot be copied in");
        }
        let data = self.store.data_mut();
        data.memory = Some(memory);
        data.alloc = alloc;
        self.state = RunState::Instantiated;

        let name = self.options.entry.clone();
        let entry = instance
            .get_func(&mut self.store, &name)
            .ok_or_else(|| VmError::EntryPoint {
                name: name.clone(),
                reason: "is not exported".to_string(),
            })?;
        let ty = entry.ty(&self.store);
        let params: Vec<ValType> = ty.params().collect();
        let results: Vec<ValType> = ty.results().collect();
        let takes_run_id = matches!(params.as_slice(), [ValType::I32]);
        let returns_ok = matches!(results.as_slice(), [] | [ValType::I32]);
        if !takes_run_id || !returns_ok {
            return Err(VmError::EntryPoint {
                name,
                reason: format!(
                    "must have type (i32) -> () or (i32) -> i32, found {} params and {} results",
                    params.len(),
                    results.len()
                ),
            });
        }

        self.state = RunState::Running;
        let mut out = vec![Val::I32(0); results.len()];
        let run_id = self.run_id();
        debug!(run_id = %run_id, entry = %name, "calling entry point");
        entry
            .call(&mut self.store, &[Val::I32(run_id.as_i32())], &mut out)
            .map_err(|e| VmError::Trap(format!("{:#}", e)))?;
        if let Some(Val::I32(code)) = out.first() {
            debug!(code, "entry point returned");
        }
        Ok(())
    }

    /// Every import of the module and whether the capability table covers it.
    pub fn imports(&self) -> Result<Vec<ImportStatus>, VmError> {
        let module = self.compile()?;
        let imports = module
            .imports()
            .map(|import| ImportStatus {
                module: import.module().to_string(),
                name: import.name().to_string(),
                provided: capabilities::lookup(import.module(), import.name()).is_some(),
            })
            .collect();
        Ok(imports)
    }
}

impl std::fmt::Debug for WasmVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmVm")
            .field("run_id", &self.run_id())
            .field("state", &self.state)
            .field("options", &self.options)
            .field("bytes", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
