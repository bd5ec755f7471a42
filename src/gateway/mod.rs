//! Chain Gateway
//!
//! Abstracts read and write RPC calls against any configured chain. Reads go
//! to the chain's fixed public RPC endpoint; writes go through the wallet's
//! signing provider.
//!
//! ## Submodules
//!
//! - `contracts` - ERC-20 and bridge relay bindings (alloy `sol!`)
//! - `evm` - alloy-backed [`ChainGateway`] implementation

pub mod contracts;
pub mod evm;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use contracts::{Bridge, ERC20};

pub use evm::EvmGateway;

/// Gas limit used when estimation fails
pub const DEFAULT_FALLBACK_GAS_LIMIT: u64 = 300_000;

/// A state-changing contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCall {
    /// `erc20.approve(spender, amount)`
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    /// `bridge.relayNative(receiver)` with `value` attached
    RelayNative {
        bridge: Address,
        receiver: Address,
        value: U256,
    },
    /// `bridge.relayTokens(token, receiver, amount)`
    RelayTokens {
        bridge: Address,
        token: Address,
        receiver: Address,
        amount: U256,
    },
}

impl WriteCall {
    /// Contract the call is sent to
    pub fn to(&self) -> Address {
        match self {
            WriteCall::Approve { token, .. } => *token,
            WriteCall::RelayNative { bridge, .. } | WriteCall::RelayTokens { bridge, .. } => {
                *bridge
            }
        }
    }

    /// Native value attached to the transaction
    pub fn value(&self) -> U256 {
        match self {
            WriteCall::RelayNative { value, .. } => *value,
            _ => U256::ZERO,
        }
    }

    /// ABI-encoded calldata
    pub fn calldata(&self) -> Bytes {
        match self {
            WriteCall::Approve {
                spender, amount, ..
            } => ERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode()
            .into(),
            WriteCall::RelayNative { receiver, .. } => Bridge::relayNativeCall {
                receiver: *receiver,
            }
            .abi_encode()
            .into(),
            WriteCall::RelayTokens {
                token,
                receiver,
                amount,
                ..
            } => Bridge::relayTokensCall {
                token: *token,
                receiver: *receiver,
                amount: *amount,
            }
            .abi_encode()
            .into(),
        }
    }

    /// Short name for logs
    pub fn method(&self) -> &'static str {
        match self {
            WriteCall::Approve { .. } => "approve",
            WriteCall::RelayNative { .. } => "relayNative",
            WriteCall::RelayTokens { .. } => "relayTokens",
        }
    }
}

/// The parts of a mined receipt the orchestrator cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted
    pub success: bool,
}

/// Read/write access to the supported chains
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Native balance of `owner`
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256>;

    /// ERC-20 balance of `owner`
    async fn token_balance(&self, chain_id: u64, token: Address, owner: Address) -> Result<U256>;

    /// ERC-20 allowance granted by `owner` to `spender`
    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256>;

    /// Gas estimate for `call` sent from `from`
    async fn estimate_gas(&self, chain_id: u64, from: Address, call: &WriteCall) -> Result<u64>;

    /// Sign and broadcast `call`; resolves once the node accepts it
    async fn send(
        &self,
        chain_id: u64,
        from: Address,
        call: &WriteCall,
        gas_limit: u64,
    ) -> Result<TxHash>;

    /// Receipt lookup; `Ok(None)` while the node has not indexed the transaction
    async fn transaction_receipt(&self, chain_id: u64, tx_hash: TxHash)
        -> Result<Option<TxReceipt>>;
}

/// Estimate gas for `call`, falling back to `fallback_gas_limit` on failure,
/// then send it.
///
/// Estimation is advisory: non-standard tokens routinely break it, so its
/// failure never blocks submission.
pub async fn send_with_gas_fallback<G: ChainGateway + ?Sized>(
    gateway: &G,
    chain_id: u64,
    from: Address,
    call: &WriteCall,
    fallback_gas_limit: u64,
) -> Result<TxHash> {
    let gas_limit = match gateway.estimate_gas(chain_id, from, call).await {
        Ok(gas) => {
            debug!(method = call.method(), chain_id, gas, "Gas estimated");
            gas
        }
        Err(e) => {
            warn!(
                method = call.method(),
                chain_id,
                error = %e,
                fallback_gas_limit,
                "Gas estimation failed, using fallback gas limit"
            );
            fallback_gas_limit
        }
    };

    let tx_hash = gateway.send(chain_id, from, call, gas_limit).await?;
    info!(
        method = call.method(),
        chain_id,
        tx_hash = %tx_hash,
        gas_limit,
        "Transaction accepted by node"
    );
    Ok(tx_hash)
}

// ============================================================================
// RPC error classification
// ============================================================================

/// How an RPC/provider error maps onto the bridge error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorClass {
    /// Node has not indexed the transaction yet
    NotFound,
    /// Wallet declined to sign
    UserRejected,
    /// Execution reverted or node refused the transaction
    Rejected,
    /// Anything else
    Other,
}

/// Classify a provider error message
pub fn classify_rpc_error(error: &str) -> RpcErrorClass {
    let error_lower = error.to_lowercase();

    if error_lower.contains("user rejected")
        || error_lower.contains("user denied")
        || error_lower.contains("rejected by user")
        || error_lower.contains("code: 4001")
        || error_lower.contains("code 4001")
    {
        return RpcErrorClass::UserRejected;
    }

    if error_lower.contains("transaction not found")
        || error_lower.contains("unknown transaction")
        || error_lower.contains("not indexed")
    {
        return RpcErrorClass::NotFound;
    }

    if error_lower.contains("reverted")
        || error_lower.contains("insufficient funds")
        || error_lower.contains("nonce too low")
        || error_lower.contains("underpriced")
        || error_lower.contains("intrinsic gas too low")
        || error_lower.contains("exceeds block gas limit")
        || error_lower.contains("already known")
    {
        return RpcErrorClass::Rejected;
    }

    RpcErrorClass::Other
}

/// Map a failed write call onto the taxonomy
pub fn write_error(error: &str) -> BridgeError {
    match classify_rpc_error(error) {
        RpcErrorClass::UserRejected => BridgeError::UserRejected(error.to_string()),
        _ => BridgeError::SubmissionFailure(error.to_string()),
    }
}
