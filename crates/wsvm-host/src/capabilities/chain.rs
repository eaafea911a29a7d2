//! `ws_call_contract` / `ws_send_tx`.

use super::{arity_mismatch, copy_out, fail, finish, read_string, HostCall};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use wsvm_core::chain::{ChainClient, ReadCall, SendTx};
use wsvm_core::diagnostics::{DiagnosticRecord, HostEvent};
use wsvm_core::error::{CollaboratorError, HostError, HostResult};
use wsvm_core::status::StatusCode;

/// Guest-side call descriptor.
#[derive(Debug, Deserialize)]
struct ChainInput {
    #[serde(alias = "target")]
    to: String,
    #[serde(alias = "payload")]
    data: String,
    #[serde(default)]
    value: Option<Value>,
}

impl ChainInput {
    fn decode(call: &mut dyn HostCall, ptr: i32, len: i32) -> HostResult<Self> {
        let text = read_string(call, ptr, len)?;
        let input: ChainInput =
            serde_json::from_str(&text).map_err(|e| HostError::MalformedCommand(e.to_string()))?;
        if input.to.is_empty() || input.data.is_empty() {
            return Err(HostError::MalformedCommand(
                "`to` and `data` must be non-empty".to_string(),
            ));
        }
        Ok(input)
    }

    fn value(&self) -> Option<String> {
        match &self.value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

fn chain_client(call: &mut dyn HostCall) -> HostResult<Arc<dyn ChainClient>> {
    call.state().services.chain.clone().ok_or_else(|| {
        HostError::Collaborator(CollaboratorError::Unavailable(
            "no chain client attached".to_string(),
        ))
    })
}

fn strip_0x(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}

fn with_0x(data: &str) -> String {
    if data.starts_with("0x") || data.starts_with("0X") {
        data.to_string()
    } else {
        format!("0x{}", data)
    }
}

pub(super) fn ws_call_contract(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[chain_id, ptr, len, out_addr, out_size] = args else {
        return arity_mismatch("ws_call_contract", args);
    };
    let result = call_contract(call, chain_id as u32, ptr, len, out_addr, out_size);
    finish(call, "ws_call_contract", result)
}

fn call_contract(
    call: &mut dyn HostCall,
    chain_id: u32,
    ptr: i32,
    len: i32,
    out_addr: i32,
    out_size: i32,
) -> HostResult<()> {
    let input = ChainInput::decode(call, ptr, len)?;
    let client = chain_client(call)?;
    let read = ReadCall {
        chain_id,
        to: input.to,
        data: input.data,
    };
    let result = client
        .read_call(&read)?
        .filter(|hex| !strip_0x(hex).is_empty())
        .ok_or_else(|| {
            CollaboratorError::Chain(format!("empty result from {} on chain {}", read.to, chain_id))
        })?;
    let bytes = hex::decode(strip_0x(&result))
        .map_err(|e| CollaboratorError::Chain(format!("invalid hex result: {}", e)))?;
    copy_out(call, bytes, out_addr, out_size)?;
    Ok(())
}

/// Dispatches the transaction and returns before it is confirmed. The
/// confirmation reaches the event sink, not this run's diagnostics.
pub(super) fn ws_send_tx(call: &mut dyn HostCall, args: &[i32]) -> StatusCode {
    let &[chain_id, ptr, len, _out_addr, _out_size] = args else {
        return arity_mismatch("ws_send_tx", args);
    };
    match send_tx(call, chain_id as u32, ptr, len) {
        Ok(()) => StatusCode::Ok,
        Err(err) => fail(call, "ws_send_tx", &err, StatusCode::Failed),
    }
}

fn send_tx(call: &mut dyn HostCall, chain_id: u32, ptr: i32, len: i32) -> HostResult<()> {
    let input = ChainInput::decode(call, ptr, len)?;
    let client = chain_client(call)?;
    let tx = SendTx {
        chain_id,
        to: input.to.clone(),
        data: with_0x(&input.data),
        value: input.value(),
    };
    info!(chain_id, to = %tx.to, "dispatching transaction");

    let events = call.state().services.events.clone();
    client.send_transaction(
        tx,
        Box::new(move |receipt| {
            events.publish(HostEvent::Stdout(DiagnosticRecord::info(format!(
                "call ws_send_tx {}",
                receipt.hash
            ))));
        }),
    )?;
    Ok(())
}
