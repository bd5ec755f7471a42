//! Bridge Submitter
//!
//! Builds and sends the transfer transaction. The native asset goes through
//! `relayNative` with the amount as transaction value; ERC-20s go through
//! `relayTokens` and need a confirmed allowance first.

use alloy::primitives::{Address, TxHash, U256};
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::gateway::{send_with_gas_fallback, ChainGateway, WriteCall, DEFAULT_FALLBACK_GAS_LIMIT};

/// A transfer ready to send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub chain_id: u64,
    pub bridge: Address,
    pub token: Address,
    pub sender: Address,
    pub receiver: Address,
    /// Raw units
    pub amount: U256,
    pub is_native: bool,
}

impl Transfer {
    /// The relay call for this transfer's asset kind
    pub fn write_call(&self) -> WriteCall {
        if self.is_native {
            WriteCall::RelayNative {
                bridge: self.bridge,
                receiver: self.receiver,
                value: self.amount,
            }
        } else {
            WriteCall::RelayTokens {
                bridge: self.bridge,
                token: self.token,
                receiver: self.receiver,
                amount: self.amount,
            }
        }
    }
}

/// Sends relay transactions
pub struct BridgeSubmitter<G: ?Sized> {
    gateway: Arc<G>,
    fallback_gas_limit: u64,
}

impl<G: ChainGateway + ?Sized> BridgeSubmitter<G> {
    pub fn new(gateway: Arc<G>, fallback_gas_limit: u64) -> Self {
        Self {
            gateway,
            fallback_gas_limit,
        }
    }

    pub fn with_default_gas(gateway: Arc<G>) -> Self {
        Self::new(gateway, DEFAULT_FALLBACK_GAS_LIMIT)
    }

    /// Send the transfer; returns the source-chain hash once the node accepts it
    ///
    /// Does not wait for confirmation.
    pub async fn submit(&self, transfer: &Transfer) -> Result<TxHash> {
        let call = transfer.write_call();
        info!(
            method = call.method(),
            chain_id = transfer.chain_id,
            token = %transfer.token,
            receiver = %transfer.receiver,
            amount = %transfer.amount,
            "Submitting bridge transfer"
        );

        send_with_gas_fallback(
            self.gateway.as_ref(),
            transfer.chain_id,
            transfer.sender,
            &call,
            self.fallback_gas_limit,
        )
        .await
    }
}
