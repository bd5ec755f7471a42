//! Bridge orchestration
//!
//! Drives one wallet session through the full transfer lifecycle:
//!
//! ```text
//! intent -> approval (ERC-20 only) -> relay submission -> receipt
//!        -> indexer registration -> status polling until final
//! ```
//!
//! Approval and submission failures abort the intent. Indexer failures only
//! degrade tracking: once the relay is confirmed on-chain the bridge is never
//! reported as failed.

use alloy::primitives::{TxHash, U256};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::approval::{ApprovalManager, ApprovalRequest};
use crate::chains::{ChainConfig, ChainRegistry};
use crate::config::OrchestratorConfig;
use crate::confirmation::ConfirmationPoller;
use crate::error::{BridgeError, Result};
use crate::gateway::{ChainGateway, TxReceipt};
use crate::indexer::{IndexerApi, Registration};
use crate::progress::{project_transaction, ProgressStep};
use crate::submitter::{BridgeSubmitter, Transfer};
use crate::tracker::{StatusTracker, TrackerState};
use crate::types::{ApprovalState, BridgeIntent, BridgeToken, BridgeTransaction};
use crate::wallet::{Account, WalletSession};

/// How the confirmed transfer is being followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracking {
    /// Registered with the indexer; the tracker is polling
    Tracked(BridgeTransaction),
    /// Registration failed; the on-chain transfer still succeeded
    Degraded { warning: String },
}

/// Result of a completed `submit_bridge`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOutcome {
    pub source_tx_hash: TxHash,
    pub receipt: TxReceipt,
    pub approval: ApprovalState,
    pub tracking: Tracking,
}

/// Orchestrates bridge transfers for one connected wallet
pub struct BridgeOrchestrator<G: ?Sized, I: ?Sized> {
    gateway: Arc<G>,
    indexer: Arc<I>,
    chains: ChainRegistry,
    session: WalletSession,
    approvals: ApprovalManager<G>,
    submitter: BridgeSubmitter<G>,
    poller: ConfirmationPoller,
    tracker: StatusTracker<I>,
    progress_window: Duration,
    cancel: CancellationToken,
}

impl<G, I> BridgeOrchestrator<G, I>
where
    G: ChainGateway + ?Sized + 'static,
    I: IndexerApi + ?Sized + 'static,
{
    pub fn new(
        gateway: Arc<G>,
        indexer: Arc<I>,
        chains: ChainRegistry,
        session: WalletSession,
        config: OrchestratorConfig,
    ) -> Self {
        let poller = ConfirmationPoller::new(config.confirmation.clone());
        Self {
            approvals: ApprovalManager::new(
                Arc::clone(&gateway),
                poller.clone(),
                config.reset_tokens.clone(),
                config.fallback_gas_limit,
            ),
            submitter: BridgeSubmitter::new(Arc::clone(&gateway), config.fallback_gas_limit),
            tracker: StatusTracker::new(Arc::clone(&indexer), config.tracker.clone()),
            poller,
            gateway,
            indexer,
            chains,
            session,
            progress_window: config.progress_window,
            cancel: CancellationToken::new(),
        }
    }

    pub fn account(&self) -> Account {
        self.session.account()
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn active_chain(&self) -> u64 {
        self.session.chain_id()
    }

    /// `chainChanged` notifications
    pub fn chain_changes(&self) -> watch::Receiver<u64> {
        self.session.chain_changes()
    }

    /// Approval state changes
    pub fn approval_state(&self) -> watch::Receiver<ApprovalState> {
        self.approvals.subscribe()
    }

    /// Snapshot, polling flag and polling error of the tracked transfer
    pub fn status(&self) -> watch::Receiver<TrackerState> {
        self.tracker.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.tracker.is_polling()
    }

    /// Progress step for the tracked transfer at `now`
    pub fn progress(&self, now: DateTime<Utc>) -> Option<ProgressStep> {
        self.tracker
            .snapshot()
            .transaction
            .map(|tx| project_transaction(&tx, now, self.progress_window))
    }

    /// Token that cancels in-flight approval and receipt waits
    ///
    /// The same token stays in force across chain switches, including the
    /// switch `submit_bridge` makes on its own. Once cancelled it stays
    /// cancelled until [`reset`](Self::reset) installs a fresh one.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the bridge contract may already move the intent's amount
    pub async fn check_approval(&self, intent: &BridgeIntent) -> Result<ApprovalState> {
        let amount = intent.validate()?;
        let source = self.chain(intent.from_chain_id)?;
        self.approvals
            .check(&self.approval_request(intent, source, amount))
            .await
    }

    /// Run a bridge transfer end to end
    ///
    /// Returns once the relay is confirmed on the source chain and the
    /// indexer registration has been attempted. Status polling continues in
    /// the background; observe it through [`status`](Self::status).
    pub async fn submit_bridge(&mut self, intent: &BridgeIntent) -> Result<BridgeOutcome> {
        if self.cancel.is_cancelled() {
            return Err(BridgeError::Cancelled);
        }

        let amount = intent.validate()?;
        let source = self.chain(intent.from_chain_id)?.clone();
        self.chain(intent.to_chain_id)?;

        if self.session.chain_id() != intent.from_chain_id {
            self.switch_chain(intent.from_chain_id).await?;
        }

        let sender = self.session.account().address;
        info!(
            from_chain = intent.from_chain_id,
            to_chain = intent.to_chain_id,
            token = %intent.token.symbol,
            amount = %intent.amount,
            receiver = %intent.receiver,
            "Starting bridge transfer"
        );

        let approval = if intent.token.is_native() {
            ApprovalState::not_required()
        } else {
            let request = self.approval_request(intent, &source, amount);
            self.approvals.ensure_approval(&request, &self.cancel).await?
        };

        let transfer = Transfer {
            chain_id: source.chain_id,
            bridge: source.bridge_address,
            token: intent.token.address,
            sender,
            receiver: intent.receiver,
            amount,
            is_native: intent.token.is_native(),
        };
        let source_tx_hash = self.submitter.submit(&transfer).await?;

        let receipt = self
            .poller
            .wait_for_success(
                self.gateway.as_ref(),
                source.chain_id,
                source_tx_hash,
                &self.cancel,
            )
            .await?;

        let tracking = match self
            .indexer
            .register(&Registration::new(source_tx_hash, source.chain_id, sender))
            .await
        {
            Ok(record) => {
                info!(
                    message_id = %record.message_id,
                    tx_hash = %source_tx_hash,
                    "Transfer registered with indexer"
                );
                self.tracker.track(record.clone()).await;
                Tracking::Tracked(record)
            }
            Err(e) => {
                warn!(
                    tx_hash = %source_tx_hash,
                    error = %e,
                    "Indexer registration failed; transfer succeeded on-chain but status tracking is unavailable"
                );
                Tracking::Degraded {
                    warning: e.to_string(),
                }
            }
        };

        Ok(BridgeOutcome {
            source_tx_hash,
            receipt,
            approval,
            tracking,
        })
    }

    /// Resume status tracking for a previously registered transfer
    pub async fn resume(&mut self, message_id: &str) {
        self.tracker.resume(message_id).await;
    }

    /// Transfer history for the connected account
    pub async fn history(&self, limit: u32, offset: u32) -> Result<Vec<BridgeTransaction>> {
        self.indexer
            .transactions(self.session.account().address, limit, offset)
            .await
    }

    /// Balance of `token` for the connected account on the token's chain
    pub async fn balance(&self, token: &BridgeToken) -> Result<U256> {
        self.chain(token.chain_id)?;
        let owner = self.session.account().address;
        if token.is_native() {
            self.gateway.native_balance(token.chain_id, owner).await
        } else {
            self.gateway
                .token_balance(token.chain_id, token.address, owner)
                .await
        }
    }

    /// Point the wallet at `chain_id`, stopping all periodic tasks first
    pub async fn switch_chain(&mut self, chain_id: u64) -> Result<bool> {
        if self.chains.get(chain_id).is_none() {
            return Err(BridgeError::UnsupportedChain(chain_id));
        }
        if self.session.chain_id() == chain_id {
            return Ok(false);
        }
        self.teardown().await;
        self.session.switch_chain(chain_id, &self.chains)
    }

    /// Stop every periodic task and forget the tracked transfer
    ///
    /// Cancels outstanding waits and hands out a fresh cancel token.
    pub async fn reset(&mut self) {
        self.cancel.cancel();
        self.teardown().await;
        self.cancel = CancellationToken::new();
        self.approvals.reset();
        info!("Bridge state reset");
    }

    /// Stop everything and disconnect the wallet
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        self.teardown().await;
        let BridgeOrchestrator { session, .. } = self;
        session.disconnect();
    }

    async fn teardown(&mut self) {
        self.tracker.clear().await;
    }

    fn chain(&self, chain_id: u64) -> Result<&ChainConfig> {
        self.chains
            .get(chain_id)
            .ok_or(BridgeError::UnsupportedChain(chain_id))
    }

    fn approval_request(
        &self,
        intent: &BridgeIntent,
        source: &ChainConfig,
        amount: U256,
    ) -> ApprovalRequest {
        ApprovalRequest {
            chain_id: source.chain_id,
            token: intent.token.address,
            spender: source.bridge_address,
            owner: self.session.account().address,
            required_amount: amount,
        }
    }
}

