use super::{arity_mismatch, copy_out, finish, read_string, HostCall};
use wsvm_core::error::{HostError, HostResult};
use wsvm_core::status::StatusCode;

pub(super) fn ws_get_env(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[kptr, klen, out_addr, out_size] = args else {
        return arity_mismatch("ws_get_env", args);
    };
    match get_env(call, kptr, klen, out_addr, out_size) {
        Err(err @ HostError::EnvKeyNotFound(_)) => {
            call.state().diagnostics.push_stderr(err.to_string());
            err.status()
        }
        result => finish(call, "ws_get_env", result),
    }
}

fn get_env(call: &mut dyn HostCall, kptr: i32, klen: i32, out_addr: i32, out_size: i32) -> HostResult<()> {
    let key = read_string(call, kptr, klen)?;
    let value = call
        .state()
        .services
        .env
        .lookup(&key)
        .ok_or(HostError::EnvKeyNotFound(key))?;
    copy_out(call, value, out_addr, out_size)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::harness::TestCall;
    use crate::context::HostServices;
    use std::sync::Arc;
    use wsvm_core::env::MapEnv;

    fn call_with_env() -> TestCall {
        let env = MapEnv::new().with_var("API_URL", "http://localhost:8888");
        TestCall::new(HostServices::new().with_env(Arc::new(env)))
    }

    #[test]
    fn hit_copies_value() {
        let mut call = call_with_env();
        let (kptr, klen) = call.put(64, b"API_URL");
        let status = ws_get_env(&mut call, &[kptr, klen, 16, 20]);
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(call.output(16, 20), b"http://localhost:8888");
        assert!(call.stderr().is_empty());
    }

    #[test]
    fn miss_records_one_stderr_line() {
        let mut call = call_with_env();
        let (kptr, klen) = call.put(64, b"MISSING");
        let status = ws_get_env(&mut call, &[kptr, klen, 16, 20]);
        assert_eq!(status, StatusCode::EnvKeyNotFound);
        assert_eq!(call.stderr(), ["env key not found: MISSING"]);
    }

    #[test]
    fn bad_key_range_fails_from_vm() {
        let mut call = call_with_env();
        let status = ws_get_env(&mut call, &[8000, 500, 16, 20]);
        assert_eq!(status, StatusCode::TransDataFromVMFailed);
        let stderr = call.stderr();
        assert_eq!(stderr.len(), 1);
        assert!(stderr[0].starts_with("ws_get_env: "), "{}", stderr[0]);
    }

    #[test]
    fn bad_output_slot_is_internal() {
        let mut call = call_with_env();
        let (kptr, klen) = call.put(64, b"API_URL");
        let before = call.heap.bytes().to_vec();
        let status = ws_get_env(&mut call, &[kptr, klen, 8190, 20]);
        assert_eq!(status, StatusCode::HostInternal);
        // Neither the heap nor the valid `out_size` slot was touched.
        assert_eq!(call.heap.bytes(), before.as_slice());
        assert_eq!(call.stderr().len(), 1);
    }
}
