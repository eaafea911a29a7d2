use super::{arity_mismatch, copy_out, fail, HostCall};
use tracing::debug;
use wsvm_core::status::StatusCode;

/// Copies the run's payload slot. The guest's run id is not a lookup key:
/// there is one slot per run.
pub(super) fn ws_get_data(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[rid, out_addr, out_size] = args else {
        return arity_mismatch("ws_get_data", args);
    };
    let state = call.state();
    if rid != state.run_id.as_i32() {
        debug!(rid, run_id = %state.run_id, "ws_get_data with foreign run id");
    }
    let data = state.ctx_data.clone();
    match copy_out(call, data, out_addr, out_size) {
        Ok(_) => StatusCode::Ok,
        Err(err) => fail(call, "ws_get_data", &err, StatusCode::ResourceNotFound),
    }
}
