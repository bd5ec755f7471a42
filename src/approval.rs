//! Approval Manager
//!
//! Decides whether the bridge contract's allowance suffices for a transfer
//! and, if not, submits a single approval and waits for it to confirm.
//!
//! ## Decision rules
//!
//! 1. Native asset: never requires approval.
//! 2. `required = allowance < required_amount` (equality suffices).
//! 3. Tokens that reject non-zero to non-zero allowance changes with an
//!    existing non-zero allowance fail with
//!    [`BridgeError::ApprovalResetRequired`]; no transaction is sent because
//!    the token would revert it.
//! 4. Otherwise approve `U256::MAX`, so later transfers of the same token to
//!    the same spender need no further approval.

use alloy::primitives::{address, Address, U256};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::confirmation::ConfirmationPoller;
use crate::error::{BridgeError, Result};
use crate::gateway::{send_with_gas_fallback, ChainGateway, WriteCall};
use crate::types::{ApprovalState, NATIVE_ASSET};

/// Tether USD on Ethereum mainnet
pub const MAINNET_USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");

/// Tokens whose `approve` reverts when changing one non-zero allowance to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequiredTokens {
    tokens: HashSet<(u64, Address)>,
}

impl ResetRequiredTokens {
    pub fn empty() -> Self {
        Self {
            tokens: HashSet::new(),
        }
    }

    pub fn insert(&mut self, chain_id: u64, token: Address) {
        self.tokens.insert((chain_id, token));
    }

    pub fn contains(&self, chain_id: u64, token: Address) -> bool {
        self.tokens.contains(&(chain_id, token))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl Default for ResetRequiredTokens {
    fn default() -> Self {
        let mut tokens = Self::empty();
        tokens.insert(1, MAINNET_USDT);
        tokens
    }
}

/// Inputs to an allowance decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub chain_id: u64,
    pub token: Address,
    pub spender: Address,
    pub owner: Address,
    /// Raw units the spender must be allowed to move
    pub required_amount: U256,
}

/// Allowance checks and approval submission
pub struct ApprovalManager<G: ?Sized> {
    gateway: Arc<G>,
    poller: ConfirmationPoller,
    reset_tokens: ResetRequiredTokens,
    fallback_gas_limit: u64,
    state: watch::Sender<ApprovalState>,
}

impl<G: ChainGateway + ?Sized> ApprovalManager<G> {
    pub fn new(
        gateway: Arc<G>,
        poller: ConfirmationPoller,
        reset_tokens: ResetRequiredTokens,
        fallback_gas_limit: u64,
    ) -> Self {
        let (state, _) = watch::channel(ApprovalState::default());
        Self {
            gateway,
            poller,
            reset_tokens,
            fallback_gas_limit,
            state,
        }
    }

    /// Observe approval state changes
    pub fn subscribe(&self) -> watch::Receiver<ApprovalState> {
        self.state.subscribe()
    }

    /// Latest published approval state
    pub fn state(&self) -> ApprovalState {
        *self.state.borrow()
    }

    /// Read-only allowance check; never sends a transaction
    pub async fn check(&self, request: &ApprovalRequest) -> Result<ApprovalState> {
        let state = if request.token == NATIVE_ASSET {
            ApprovalState::not_required()
        } else {
            let allowance = self.current_allowance(request).await?;
            ApprovalState {
                required: allowance < request.required_amount,
                in_flight: false,
                tx_hash: None,
            }
        };
        self.state.send_replace(state);
        Ok(state)
    }

    /// Make sure `spender` may move `required_amount`, approving if needed
    ///
    /// Sends at most one transaction and returns only after it is confirmed.
    pub async fn ensure_approval(
        &self,
        request: &ApprovalRequest,
        cancel: &CancellationToken,
    ) -> Result<ApprovalState> {
        if request.token == NATIVE_ASSET {
            let state = ApprovalState::not_required();
            self.state.send_replace(state);
            return Ok(state);
        }

        let allowance = self.current_allowance(request).await?;
        if allowance >= request.required_amount {
            info!(
                token = %request.token,
                spender = %request.spender,
                allowance = %allowance,
                "Allowance already sufficient"
            );
            let state = ApprovalState::not_required();
            self.state.send_replace(state);
            return Ok(state);
        }

        let pending = ApprovalState {
            required: true,
            in_flight: false,
            tx_hash: None,
        };

        if !allowance.is_zero() && self.reset_tokens.contains(request.chain_id, request.token) {
            warn!(
                token = %request.token,
                spender = %request.spender,
                allowance = %allowance,
                "Token requires allowance reset before re-approval"
            );
            self.state.send_replace(pending);
            return Err(BridgeError::ApprovalResetRequired {
                token: request.token,
                spender: request.spender,
                current_allowance: allowance,
            });
        }

        let call = WriteCall::Approve {
            token: request.token,
            spender: request.spender,
            amount: U256::MAX,
        };
        let tx_hash = match send_with_gas_fallback(
            self.gateway.as_ref(),
            request.chain_id,
            request.owner,
            &call,
            self.fallback_gas_limit,
        )
        .await
        {
            Ok(hash) => hash,
            Err(e) => {
                self.state.send_replace(pending);
                return Err(e);
            }
        };

        self.state.send_replace(ApprovalState {
            required: true,
            in_flight: true,
            tx_hash: Some(tx_hash),
        });

        if let Err(e) = self
            .poller
            .wait_for_success(self.gateway.as_ref(), request.chain_id, tx_hash, cancel)
            .await
        {
            self.state.send_replace(ApprovalState {
                tx_hash: Some(tx_hash),
                ..pending
            });
            return Err(e);
        }

        info!(token = %request.token, tx_hash = %tx_hash, "Approval confirmed");
        let state = ApprovalState {
            required: false,
            in_flight: false,
            tx_hash: Some(tx_hash),
        };
        self.state.send_replace(state);
        Ok(state)
    }

    /// Reset published state, e.g. when the user starts over
    pub fn reset(&self) {
        self.state.send_replace(ApprovalState::default());
    }

    async fn current_allowance(&self, request: &ApprovalRequest) -> Result<U256> {
        self.gateway
            .allowance(
                request.chain_id,
                request.token,
                request.owner,
                request.spender,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reset_tokens_include_mainnet_usdt() {
        let tokens = ResetRequiredTokens::default();
        assert!(tokens.contains(1, MAINNET_USDT));
        assert!(!tokens.contains(369, MAINNET_USDT));
        assert_eq!(tokens.len(), 1);
        assert!(ResetRequiredTokens::empty().is_empty());
    }
}
