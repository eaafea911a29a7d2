//! Guest logging: `ws_log`, the toolchain `abort` hook, and the MQTT placeholder.

use super::{arity_mismatch, fail, read_string, HostCall};
use crate::codec::{decode_diagnostic_string, guest_u32};
use tracing::{debug, warn};
use wsvm_core::error::HostResult;
use wsvm_core::status::StatusCode;

pub(super) fn ws_log(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[level, ptr, len] = args else {
        return arity_mismatch("ws_log", args);
    };
    match read_string(call, ptr, len) {
        Ok(message) => {
            debug!(level, message = %message, "guest log");
            call.state().diagnostics.push_stdout(message);
            StatusCode::Ok
        }
        Err(err) => fail(call, "ws_log", &err, StatusCode::Failed),
    }
}

pub(super) fn ws_send_mqtt_msg(call: &mut dyn HostCall, _args: &[i32]) -> StatusCode {
    call.state()
        .diagnostics
        .push_stderr("ws_send_mqtt_msg is not supported");
    StatusCode::ImportNotFound
}

/// `abort(msg, file, line, col)`. The signature has no result; the
/// returned status is discarded by the binding.
pub(super) fn abort(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[msg, file, line, col] = args else {
        return arity_mismatch("abort", args);
    };
    match decode_abort(call, guest_u32(msg), guest_u32(file)) {
        Ok((message, file)) => {
            let (line, col) = (guest_u32(line), guest_u32(col));
            let file = file.unwrap_or_else(|| "<unknown>".to_string());
            warn!(
                file = %file,
                line,
                col,
                message = message.as_deref().unwrap_or(""),
                "guest abort"
            );
            let record = message.unwrap_or_else(|| format!("abort at {}:{}:{}", file, line, col));
            call.state().diagnostics.push_stdout(record);
            StatusCode::Ok
        }
        Err(err) => {
            call.state()
                .diagnostics
                .push_stderr(format!("abort: {}", err));
            err.status()
        }
    }
}

fn decode_abort(
    call: &mut dyn HostCall,
    msg: u32,
    file: u32,
) -> HostResult<(Option<String>, Option<String>)> {
    let memory = call.memory()?;
    let message = decode_diagnostic_string(&memory, msg)?;
    // A bad file pointer does not hide the message.
    let file = decode_diagnostic_string(&memory, file).unwrap_or(None);
    Ok((message, file))
}
