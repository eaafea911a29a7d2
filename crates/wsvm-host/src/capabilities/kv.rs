use super::{arity_mismatch, copy_out, fail, read_string, HostCall};
use wsvm_core::error::{HostError, HostResult};
use wsvm_core::status::StatusCode;

pub(super) fn ws_set_db(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[kptr, klen, vptr, vlen] = args else {
        return arity_mismatch("ws_set_db", args);
    };
    match set(call, kptr, klen, vptr, vlen) {
        Ok(()) => StatusCode::Ok,
        Err(err) => fail(call, "ws_set_db", &err, StatusCode::Failed),
    }
}

fn set(call: &mut dyn HostCall, kptr: i32, klen: i32, vptr: i32, vlen: i32) -> HostResult<()> {
    let key = read_string(call, kptr, klen)?;
    let value = read_string(call, vptr, vlen)?;
    let state = call.state();
    state.services.kv.set(&key, &value)?;
    state
        .diagnostics
        .push_stdout(format!("call ws_set_db {}: {}", key, value));
    Ok(())
}

pub(super) fn ws_get_db(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[kptr, klen, out_addr, out_size] = args else {
        return arity_mismatch("ws_get_db", args);
    };
    match get(call, kptr, klen, out_addr, out_size) {
        Ok(()) => StatusCode::Ok,
        Err(err @ HostError::NotFound(_)) => err.status(),
        Err(err) => fail(call, "ws_get_db", &err, StatusCode::Failed),
    }
}

fn get(call: &mut dyn HostCall, kptr: i32, klen: i32, out_addr: i32, out_size: i32) -> HostResult<()> {
    let key = read_string(call, kptr, klen)?;
    let value = call
        .state()
        .services
        .kv
        .get(&key)?
        .ok_or_else(|| HostError::NotFound(key.clone()))?;
    copy_out(call, value.as_str(), out_addr, out_size)?;
    call.state()
        .diagnostics
        .push_stdout(format!("call ws_get_db {}: {}", key, value));
    Ok(())
}
