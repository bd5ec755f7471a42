//! Wallet adapter boundary
//!
//! Wallets report the connected account in several shapes (a bare address
//! string, an array of addresses, or an object with an `address` field).
//! [`Account::from_wallet_value`] normalizes them once so nothing downstream
//! has to care.

use alloy::primitives::Address;
use eyre::{eyre, Result};
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::info;

use crate::chains::ChainRegistry;
use crate::error::BridgeError;

/// A connected wallet account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Account {
    pub address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// Normalize a wallet-reported account value
    pub fn from_wallet_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Array(items) => items
                .first()
                .ok_or_else(|| eyre!("Wallet returned no accounts"))
                .and_then(Self::from_wallet_value),
            Value::Object(map) => map
                .get("address")
                .ok_or_else(|| eyre!("Wallet account object has no 'address' field"))
                .and_then(Self::from_wallet_value),
            other => Err(eyre!("Unsupported wallet account shape: {}", other)),
        }
    }

    fn parse(s: &str) -> Result<Self> {
        let address =
            Address::from_str(s.trim()).map_err(|e| eyre!("Invalid account address {}: {}", s, e))?;
        Ok(Self { address })
    }
}

/// One connected wallet: its account and the chain it is pointed at
///
/// Chain switches are published on a watch channel (the `chainChanged`
/// event); subscribers see the latest chain id only.
pub struct WalletSession {
    account: Account,
    chain_tx: watch::Sender<u64>,
}

impl WalletSession {
    pub fn connect(account: Account, chain_id: u64) -> Self {
        info!(account = %account.address, chain_id, "Wallet connected");
        let (chain_tx, _) = watch::channel(chain_id);
        Self { account, chain_tx }
    }

    pub fn account(&self) -> Account {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        *self.chain_tx.borrow()
    }

    /// Subscribe to `chainChanged` notifications
    pub fn chain_changes(&self) -> watch::Receiver<u64> {
        self.chain_tx.subscribe()
    }

    /// Point the session at another configured chain
    ///
    /// Returns `true` when the active chain actually changed.
    pub fn switch_chain(
        &self,
        chain_id: u64,
        chains: &ChainRegistry,
    ) -> std::result::Result<bool, BridgeError> {
        if chains.get(chain_id).is_none() {
            return Err(BridgeError::UnsupportedChain(chain_id));
        }
        let changed = self.chain_tx.send_if_modified(|current| {
            if *current == chain_id {
                false
            } else {
                *current = chain_id;
                true
            }
        });
        if changed {
            info!(account = %self.account.address, chain_id, "Wallet switched chain");
        }
        Ok(changed)
    }

    pub fn disconnect(self) {
        info!(account = %self.account.address, "Wallet disconnected");
    }
}
