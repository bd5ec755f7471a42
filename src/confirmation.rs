//! Confirmation Poller
//!
//! Polls the source chain for a transaction receipt on a fixed cadence until
//! it appears. A missing receipt is the expected steady state while the node
//! catches up, so it is never treated as an error.
//!
//! Block inclusion time is unpredictable, so polling is unbounded by default.
//! Callers that need a ceiling pass a [`CancellationToken`] or configure
//! `max_attempts`.

use alloy::primitives::TxHash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::gateway::{ChainGateway, TxReceipt};

/// Default receipt poll cadence
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Confirmation poller configuration
#[derive(Debug, Clone)]
pub struct ConfirmationConfig {
    /// Delay between receipt lookups
    pub poll_interval: Duration,
    /// Give up after this many lookups; `None` polls forever
    pub max_attempts: Option<u32>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

/// Waits for transaction receipts
#[derive(Debug, Clone, Default)]
pub struct ConfirmationPoller {
    config: ConfirmationConfig,
}

impl ConfirmationPoller {
    pub fn new(config: ConfirmationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// Poll until the receipt for `tx_hash` appears on `chain_id`
    ///
    /// The first lookup happens immediately. A found-but-reverted receipt is
    /// returned as-is; use [`ConfirmationPoller::wait_for_success`] to turn it
    /// into an error.
    pub async fn wait_for_receipt<G: ChainGateway + ?Sized>(
        &self,
        gateway: &G,
        chain_id: u64,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt> {
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!(tx_hash = %tx_hash, attempts, "Receipt polling cancelled");
                return Err(BridgeError::Cancelled);
            }

            attempts += 1;
            match gateway.transaction_receipt(chain_id, tx_hash).await? {
                Some(receipt) => {
                    info!(
                        tx_hash = %tx_hash,
                        chain_id,
                        block = ?receipt.block_number,
                        success = receipt.success,
                        attempts,
                        "Transaction receipt found"
                    );
                    return Ok(receipt);
                }
                None => {
                    debug!(tx_hash = %tx_hash, attempts, "Receipt not available yet");
                }
            }

            if let Some(max) = self.config.max_attempts {
                if attempts >= max {
                    warn!(tx_hash = %tx_hash, attempts, "Receipt polling gave up");
                    return Err(BridgeError::ConfirmationTimeout { tx_hash, attempts });
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(tx_hash = %tx_hash, attempts, "Receipt polling cancelled");
                    return Err(BridgeError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Like [`wait_for_receipt`](Self::wait_for_receipt) but a reverted
    /// receipt becomes [`BridgeError::Reverted`]
    pub async fn wait_for_success<G: ChainGateway + ?Sized>(
        &self,
        gateway: &G,
        chain_id: u64,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> Result<TxReceipt> {
        let receipt = self
            .wait_for_receipt(gateway, chain_id, tx_hash, cancel)
            .await?;
        if !receipt.success {
            return Err(BridgeError::Reverted { tx_hash });
        }
        Ok(receipt)
    }

    /// Run the poll as a background task
    pub fn spawn<G>(&self, gateway: Arc<G>, chain_id: u64, tx_hash: TxHash) -> ReceiptWatch
    where
        G: ChainGateway + ?Sized + 'static,
    {
        let cancel = CancellationToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            poller
                .wait_for_receipt(gateway.as_ref(), chain_id, tx_hash, &token)
                .await
        });
        ReceiptWatch { cancel, handle }
    }
}

/// Handle to a background receipt poll
///
/// Dropping the handle does not stop the task; call [`ReceiptWatch::stop`].
pub struct ReceiptWatch {
    cancel: CancellationToken,
    handle: JoinHandle<Result<TxReceipt>>,
}

impl ReceiptWatch {
    /// Wait for the poll to finish
    pub async fn join(self) -> Result<TxReceipt> {
        self.handle
            .await
            .map_err(|e| BridgeError::Rpc(format!("receipt task failed: {}", e)))?
    }

    /// Cancel the poll and wait for the task to exit
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
