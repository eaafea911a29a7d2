//! `wasi_snapshot_preview1` stubs. Guests built for WASI link against these
//! but get no system interface behind them.

use super::HostCall;
use tracing::{debug, info};
use wsvm_core::status::StatusCode;

pub(super) fn stub(_call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    debug!(args = args.len(), "wasi stub");
    StatusCode::Ok
}

/// Does not unwind the guest; execution continues after the call.
pub(super) fn proc_exit(_call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    info!(code = args.first().copied().unwrap_or_default(), "guest called proc_exit");
    StatusCode::Ok
}
