//! Bridges an async chain backend to the synchronous [`ChainClient`] the
//! capability table calls.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn};
use wsvm_core::chain::{ChainClient, ReadCall, SendTx, TxCallback, TxReceipt};
use wsvm_core::error::{CollabResult, CollaboratorError};

/// An RPC-style chain node.
#[async_trait]
pub trait ChainBackend: Send + Sync + 'static {
    /// Executes a read-only call and returns the hex result, if any.
    async fn call(&self, call: ReadCall) -> CollabResult<Option<String>>;

    /// Submits a transaction and resolves once it is confirmed.
    async fn send(&self, tx: SendTx) -> CollabResult<TxReceipt>;
}

/// [`ChainClient`] over a [`ChainBackend`] running on a tokio runtime.
///
/// Reads block the calling thread on `handle`. From a multi-thread worker
/// the block goes through `block_in_place`; a current-thread runtime cannot
/// be blocked, so reads there fail as unavailable. Sends are spawned and
/// return immediately.
pub struct AsyncChainClient<B> {
    backend: Arc<B>,
    handle: Handle,
}

impl<B: ChainBackend> AsyncChainClient<B> {
    pub fn new(backend: Arc<B>, handle: Handle) -> Self {
        Self { backend, handle }
    }

    /// Uses the runtime the caller is currently inside.
    pub fn current(backend: Arc<B>) -> Self {
        Self::new(backend, Handle::current())
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

impl<B: ChainBackend> ChainClient for AsyncChainClient<B> {
    fn read_call(&self, call: &ReadCall) -> CollabResult<Option<String>> {
        let backend = self.backend.clone();
        let call = call.clone();
        debug!(chain_id = call.chain_id, to = %call.to, "chain read");
        let read = async move { backend.call(call).await };
        match Handle::try_current().map(|current| current.runtime_flavor()) {
            Err(_) => self.handle.block_on(read),
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| self.handle.block_on(read))
            }
            Ok(flavor) => Err(CollaboratorError::Unavailable(format!(
                "chain read cannot block a {:?} runtime",
                flavor
            ))),
        }
    }

    fn send_transaction(&self, tx: SendTx, on_success: TxCallback) -> CollabResult<()> {
        let backend = self.backend.clone();
        self.handle.spawn(async move {
            let chain_id = tx.chain_id;
            match backend.send(tx).await {
                Ok(receipt) => {
                    debug!(chain_id, hash = %receipt.hash, "transaction confirmed");
                    on_success(receipt);
                }
                Err(e) => warn!(chain_id, error = %e, "transaction failed"),
            }
        });
        Ok(())
    }
}
