//! Submission of the transactions accumulated during a deployment.

use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use alloy_core::primitives::{B256, Bytes};
use anyhow::Context;
use serde::Serialize;

use crate::rpc::RpcClient;

/// Default time to wait for each receipt.
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

/// The outcome of one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResult {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Accumulates signed transactions and submits them in one batch.
///
/// Submission is not atomic: a failure part way leaves the earlier
/// transactions on chain. Implementations never retry.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self) -> impl Future<Output = anyhow::Result<Vec<BroadcastResult>>> + Send;
}

/// Signed raw transactions waiting to be broadcast, in submission order.
#[derive(Debug, Clone, Default)]
pub struct TxQueue(Arc<Mutex<Vec<Bytes>>>);

impl TxQueue {
    pub fn push(&self, tx: Bytes) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn drain(&self) -> Vec<Bytes> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Broadcasts queued raw transactions over JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcBroadcaster {
    client: RpcClient,
    queue: TxQueue,
    receipt_timeout: Duration,
}

impl RpcBroadcaster {
    pub fn new(client: RpcClient, receipt_timeout: Duration) -> Self {
        Self {
            client,
            queue: TxQueue::default(),
            receipt_timeout,
        }
    }

    /// The queue the deployment engine appends to.
    pub fn queue(&self) -> TxQueue {
        self.queue.clone()
    }
}

impl Broadcaster for RpcBroadcaster {
    async fn broadcast(&self) -> anyhow::Result<Vec<BroadcastResult>> {
        let txs = self.queue.drain();
        let total = txs.len();
        tracing::info!(total, "Broadcasting transactions...");

        let mut hashes = Vec::with_capacity(total);
        for (i, tx) in txs.iter().enumerate() {
            let hash = self.client.send_raw_transaction(tx).await.with_context(|| {
                format!("Failed to submit transaction {} of {total}, {i} already submitted", i + 1)
            })?;
            tracing::debug!(%hash, index = i, "Transaction submitted");
            hashes.push(hash);
        }

        let mut results = Vec::with_capacity(total);
        for hash in hashes {
            let receipt = self
                .client
                .wait_for_receipt(hash, self.receipt_timeout)
                .await?;
            if !receipt.succeeded() {
                anyhow::bail!("Transaction {hash} reverted");
            }
            results.push(BroadcastResult {
                tx_hash: hash,
                block_number: receipt.block_number,
            });
        }

        tracing::info!(total, "Transactions confirmed");
        Ok(results)
    }
}
