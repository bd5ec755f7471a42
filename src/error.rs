//! Error taxonomy for bridge operations
//!
//! Receipt-not-found during confirmation polling is not an error: the gateway
//! reports it as `Ok(None)`.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

/// Errors surfaced by the orchestrator and its components
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The wallet declined to sign; never retried
    #[error("transaction rejected by wallet: {0}")]
    UserRejected(String),

    /// Token rejects non-zero to non-zero allowance changes
    #[error(
        "token {token} already has an allowance of {current_allowance} for {spender}; \
         revoke it (set it to 0) before approving a new amount"
    )]
    ApprovalResetRequired {
        token: Address,
        spender: Address,
        current_allowance: U256,
    },

    /// Node rejected the transaction at submission time
    #[error("transaction submission failed: {0}")]
    SubmissionFailure(String),

    /// Transaction was mined but reverted
    #[error("transaction {tx_hash} reverted on-chain")]
    Reverted { tx_hash: TxHash },

    /// Read call or receipt lookup failed
    #[error("rpc error: {0}")]
    Rpc(String),

    /// Indexer registration failed after the on-chain send succeeded
    #[error("indexer registration failed: {0}")]
    IndexerSubmissionFailure(String),

    /// Indexer status poll failed
    #[error("indexer polling failed: {0}")]
    PollingFailure(String),

    #[error("invalid bridge intent: {0}")]
    InvalidIntent(String),

    #[error("chain {0} is not configured")]
    UnsupportedChain(u64),

    #[error("operation cancelled")]
    Cancelled,

    /// Receipt was not found within the configured attempt bound
    #[error("no receipt for {tx_hash} after {attempts} attempts")]
    ConfirmationTimeout { tx_hash: TxHash, attempts: u32 },
}

impl BridgeError {
    /// Whether the error leaves the on-chain transfer intact
    ///
    /// Tracking failures degrade status reporting only; the bridge itself is
    /// not failed.
    pub fn is_tracking_only(&self) -> bool {
        matches!(
            self,
            BridgeError::IndexerSubmissionFailure(_) | BridgeError::PollingFailure(_)
        )
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_required_message_is_actionable() {
        let err = BridgeError::ApprovalResetRequired {
            token: Address::repeat_byte(0x11),
            spender: Address::repeat_byte(0x22),
            current_allowance: U256::from(5u64),
        };
        let msg = err.to_string();
        assert!(msg.contains("revoke"));
        assert!(msg.contains("allowance of 5"));
    }

    #[test]
    fn test_tracking_only_errors() {
        assert!(BridgeError::IndexerSubmissionFailure("503".into()).is_tracking_only());
        assert!(BridgeError::PollingFailure("timeout".into()).is_tracking_only());
        assert!(!BridgeError::SubmissionFailure("nonce".into()).is_tracking_only());
        assert!(!BridgeError::UserRejected("denied".into()).is_tracking_only());
    }
}
