//! The table of host functions a guest can import.
//!
//! Every entry has the same handler shape: raw `i32` arguments in, one
//! [`StatusCode`] out. Decode and marshaling failures are converted to a
//! status inside the handler and never reach the engine as a trap.

mod chain;
mod data;
mod db;
mod env;
mod kv;
mod log;
mod wasi;

use crate::codec::{copy_host_value_to_guest, decode_utf8, guest_u32, HostValue};
use crate::context::HostState;
use crate::memory::{GuestHeap, MemoryView};
use tracing::{debug, warn};
use wasmtime::{Caller, Engine, FuncType, Linker, Val, ValType};
use wsvm_core::error::{HostError, HostResult};
use wsvm_core::status::StatusCode;

pub const ENV_MODULE: &str = "env";
pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// A guest heap that also carries the per-run [`HostState`].
pub trait HostCall: GuestHeap {
    fn state(&mut self) -> &mut HostState;
}

impl GuestHeap for Caller<'_, HostState> {
    fn memory(&mut self) -> HostResult<MemoryView<'_>> {
        let memory = self.data().memory.ok_or(HostError::MemoryNotExported)?;
        Ok(MemoryView::new(memory.data_mut(self)))
    }

    fn alloc(&mut self, len: u32) -> HostResult<u32> {
        let alloc = self.data().alloc.clone().ok_or(HostError::AllocatorMissing)?;
        let len = i32::try_from(len)
            .map_err(|_| HostError::AllocFailed(format!("length {} exceeds i32", len)))?;
        let ptr = alloc
            .call(&mut *self, len)
            .map_err(|e| HostError::AllocFailed(e.to_string()))?;
        if ptr <= 0 {
            return Err(HostError::AllocFailed(format!("allocator returned {}", ptr)));
        }
        Ok(ptr as u32)
    }
}

impl HostCall for Caller<'_, HostState> {
    fn state(&mut self) -> &mut HostState {
        self.data_mut()
    }
}

pub type Handler = fn(&mut dyn HostCall, &[i32]) -> StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    I32,
    /// Accepted for signature compatibility and truncated to `i32`.
    I64,
}

impl ParamKind {
    fn val_type(self) -> ValType {
        match self {
            ParamKind::I32 => ValType::I32,
            ParamKind::I64 => ValType::I64,
        }
    }
}

/// One named import provided to guests.
pub struct Capability {
    pub module: &'static str,
    pub name: &'static str,
    pub params: &'static [ParamKind],
    /// `false` for imports whose signature has no result.
    pub returns_status: bool,
    pub handler: Handler,
}

impl Capability {
    pub fn func_type(&self, engine: &Engine) -> FuncType {
        let results = if self.returns_status {
            vec![ValType::I32]
        } else {
            Vec::new()
        };
        FuncType::new(engine, self.params.iter().map(|p| p.val_type()), results)
    }
}

impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns_status", &self.returns_status)
            .finish()
    }
}

use ParamKind::{I32, I64};

const fn env_import(name: &'static str, params: &'static [ParamKind], handler: Handler) -> Capability {
    Capability {
        module: ENV_MODULE,
        name,
        params,
        returns_status: true,
        handler,
    }
}

const fn wasi_stub(name: &'static str, params: &'static [ParamKind]) -> Capability {
    Capability {
        module: WASI_MODULE,
        name,
        params,
        returns_status: true,
        handler: wasi::stub,
    }
}

pub static CAPABILITIES: &[Capability] = &[
    env_import("ws_get_env", &[I32, I32, I32, I32], env::ws_get_env),
    env_import("ws_set_sql_db", &[I32, I32], db::ws_set_sql_db),
    env_import("ws_get_sql_db", &[I32, I32, I32, I32], db::ws_get_sql_db),
    env_import("ws_get_data", &[I32, I32, I32], data::ws_get_data),
    env_import("ws_call_contract", &[I32, I32, I32, I32, I32], chain::ws_call_contract),
    env_import("ws_send_tx", &[I32, I32, I32, I32, I32], chain::ws_send_tx),
    env_import("ws_set_db", &[I32, I32, I32, I32], kv::ws_set_db),
    env_import("ws_get_db", &[I32, I32, I32, I32], kv::ws_get_db),
    env_import("ws_log", &[I32, I32, I32], log::ws_log),
    env_import("ws_send_mqtt_msg", &[I32, I32, I32, I32], log::ws_send_mqtt_msg),
    Capability {
        module: ENV_MODULE,
        name: "abort",
        params: &[I32, I32, I32, I32],
        returns_status: false,
        handler: log::abort,
    },
    wasi_stub("args_get", &[I32, I32]),
    wasi_stub("args_sizes_get", &[I32, I32]),
    wasi_stub("environ_get", &[I32, I32]),
    wasi_stub("environ_sizes_get", &[I32, I32]),
    wasi_stub("clock_time_get", &[I32, I64, I32]),
    wasi_stub("fd_close", &[I32]),
    wasi_stub("fd_fdstat_get", &[I32, I32]),
    wasi_stub("fd_prestat_get", &[I32, I32]),
    wasi_stub("fd_prestat_dir_name", &[I32, I32, I32]),
    wasi_stub("fd_read", &[I32, I32, I32, I32]),
    wasi_stub("fd_seek", &[I32, I64, I32, I32]),
    wasi_stub("fd_write", &[I32, I32, I32, I32]),
    wasi_stub("path_open", &[I32, I32, I32, I32, I32, I64, I64, I32, I32]),
    Capability {
        module: WASI_MODULE,
        name: "proc_exit",
        params: &[I32],
        returns_status: false,
        handler: wasi::proc_exit,
    },
];

pub fn lookup(module: &str, name: &str) -> Option<&'static Capability> {
    CAPABILITIES
        .iter()
        .find(|cap| cap.module == module && cap.name == name)
}

fn arg_i32(val: &Val) -> i32 {
    match val {
        Val::I32(v) => *v,
        Val::I64(v) => *v as i32,
        _ => 0,
    }
}

/// Registers every capability on `linker` under its module and name.
pub fn bind(linker: &mut Linker<HostState>, engine: &Engine) -> wasmtime::Result<()> {
    for cap in CAPABILITIES {
        let handler = cap.handler;
        let name = cap.name;
        linker.func_new(
            cap.module,
            cap.name,
            cap.func_type(engine),
            move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
                let args: Vec<i32> = params.iter().map(arg_i32).collect();
                let status = handler(&mut caller, &args);
                debug!(capability = name, status = status.as_i32(), "host call");
                if let Some(slot) = results.first_mut() {
                    *slot = Val::I32(status.as_i32());
                }
                Ok(())
            },
        )?;
    }
    debug!(count = CAPABILITIES.len(), "capabilities bound");
    Ok(())
}

pub(crate) fn read_string(call: &mut dyn HostCall, ptr: i32, len: i32) -> HostResult<String> {
    let memory = call.memory()?;
    decode_utf8(&memory, guest_u32(ptr), guest_u32(len))
}

pub(crate) fn copy_out(
    call: &mut dyn HostCall,
    value: impl Into<HostValue>,
    out_addr: i32,
    out_size: i32,
) -> HostResult<u32> {
    copy_host_value_to_guest(call, &value.into(), guest_u32(out_addr), guest_u32(out_size))
}

/// Appends `capability: err` to the run's stderr and returns `status`.
pub(crate) fn fail(
    call: &mut dyn HostCall,
    capability: &str,
    err: &HostError,
    status: StatusCode,
) -> StatusCode {
    warn!(capability, status = status.as_i32(), error = %err, "host call failed");
    call.state()
        .diagnostics
        .push_stderr(format!("{}: {}", capability, err));
    status
}

/// Status for a handler result. Failures are recorded through [`fail`].
pub(crate) fn finish(call: &mut dyn HostCall, capability: &str, result: HostResult<()>) -> StatusCode {
    match result {
        Ok(()) => StatusCode::Ok,
        Err(err) => {
            let status = err.status();
            fail(call, capability, &err, status)
        }
    }
}

/// Handlers are always called with their declared arity.
pub(crate) fn arity_mismatch(capability: &str, args: &[i32]) -> StatusCode {
    warn!(capability, got = args.len(), "unexpected argument count");
    StatusCode::HostInternal
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_per_module() {
        let mut seen = HashSet::new();
        for cap in CAPABILITIES {
            assert!(seen.insert((cap.module, cap.name)), "duplicate {}", cap.name);
        }
    }

    #[test]
    fn no_result_imports() {
        let silent: Vec<_> = CAPABILITIES
            .iter()
            .filter(|c| !c.returns_status)
            .map(|c| c.name)
            .collect();
        assert_eq!(silent, ["abort", "proc_exit"]);
    }

    #[test]
    fn lookup_by_module_and_name() {
        assert_eq!(lookup("env", "ws_log").unwrap().params.len(), 3);
        assert_eq!(lookup(WASI_MODULE, "path_open").unwrap().params.len(), 9);
        assert!(lookup(WASI_MODULE, "ws_log").is_none());
    }

    #[test]
    fn wide_args_are_truncated() {
        assert_eq!(arg_i32(&Val::I64(0x1_0000_0005)), 5);
        assert_eq!(arg_i32(&Val::I32(-3)), -3);
    }
}
