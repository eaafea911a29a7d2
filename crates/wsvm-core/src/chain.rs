//! Blockchain client contract behind `ws_call_contract` / `ws_send_tx`.

use crate::error::{CollabResult, CollaboratorError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

/// Read-only contract call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadCall {
    pub chain_id: u32,
    pub to: String,
    pub data: String,
}

/// State-changing transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTx {
    pub chain_id: u32,
    pub to: String,
    /// `0x`-prefixed calldata.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
}

/// Invoked once the transaction resolves on chain.
pub type TxCallback = Box<dyn FnOnce(TxReceipt) + Send + 'static>;

pub trait ChainClient: Send + Sync {
    /// Synchronous read. `Ok(None)` means the node returned nothing.
    fn read_call(&self, call: &ReadCall) -> CollabResult<Option<String>>;

    /// Hands the transaction off and returns without waiting for confirmation.
    fn send_transaction(&self, tx: SendTx, on_success: TxCallback) -> CollabResult<()>;
}

/// Canned chain for tests and offline runs.
///
/// Reads are answered from a fixed table. Sent transactions stay pending
/// until [`StaticChain::confirm_pending`] fires their callbacks.
#[derive(Default)]
pub struct StaticChain {
    responses: RwLock<HashMap<ReadCall, String>>,
    pending: Mutex<Vec<(SendTx, TxCallback)>>,
    sent: Mutex<Vec<SendTx>>,
}

impl StaticChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, call: ReadCall, hex_result: impl Into<String>) -> Self {
        if let Ok(mut responses) = self.responses.write() {
            responses.insert(call, hex_result.into());
        }
        self
    }

    /// Every transaction handed to this chain, in dispatch order.
    pub fn sent(&self) -> Vec<SendTx> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Resolves all pending transactions. Returns how many were confirmed.
    pub fn confirm_pending(&self) -> usize {
        let drained = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return 0,
        };
        let count = drained.len();
        let base = self.sent().len() - count;
        for (i, (_, callback)) in drained.into_iter().enumerate() {
            callback(TxReceipt {
                hash: format!("0x{:064x}", base + i + 1),
            });
        }
        count
    }
}

fn poisoned() -> CollaboratorError {
    CollaboratorError::Chain("static chain lock poisoned".to_string())
}

impl ChainClient for StaticChain {
    fn read_call(&self, call: &ReadCall) -> CollabResult<Option<String>> {
        let responses = self.responses.read().map_err(|_| poisoned())?;
        Ok(responses.get(call).cloned())
    }

    fn send_transaction(&self, tx: SendTx, on_success: TxCallback) -> CollabResult<()> {
        self.sent.lock().map_err(|_| poisoned())?.push(tx.clone());
        self.pending
            .lock()
            .map_err(|_| poisoned())?
            .push((tx, on_success));
        Ok(())
    }
}
