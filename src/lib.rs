//! Bridge Orchestrator: client-side lifecycle of a CL8Y bridge transfer
//!
//! Drives a user's cross-chain transfer from intent to final status:
//!
//! - **Approval** - ERC-20 allowance checks and approve(MAX) submission
//! - **Submission** - `relayNative` / `relayTokens` on the source chain bridge
//! - **Confirmation** - receipt polling until the node has mined the transfer
//! - **Indexer** - registration and status lookups by message id
//! - **Tracking** - background status polling with an observable snapshot
//! - **Progress** - time-based display step for pending transfers
//!
//! Chain and indexer access sit behind the [`ChainGateway`] and [`IndexerApi`]
//! traits so the flow can be driven against live nodes or in-memory stubs.

pub mod approval;
pub mod chains;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod gateway;
pub mod indexer;
pub mod orchestrator;
pub mod progress;
pub mod submitter;
pub mod tracker;
pub mod types;
pub mod wallet;

// Re-export commonly used items at the crate root
pub use approval::{ApprovalManager, ApprovalRequest, ResetRequiredTokens, MAINNET_USDT};
pub use chains::{ChainConfig, ChainRegistry};
pub use config::{Config, OrchestratorConfig};
pub use confirmation::{ConfirmationConfig, ConfirmationPoller, ReceiptWatch};
pub use error::{BridgeError, Result};
pub use gateway::{ChainGateway, EvmGateway, TxReceipt, WriteCall};
pub use indexer::{HttpIndexer, IndexerApi, Registration};
pub use orchestrator::{BridgeOrchestrator, BridgeOutcome, Tracking};
pub use progress::ProgressStep;
pub use submitter::{BridgeSubmitter, Transfer};
pub use tracker::{StatusTracker, TrackerConfig, TrackerState};
pub use types::{
    ApprovalState, BridgeIntent, BridgeToken, BridgeTransaction, TokenPair, TokenPairs,
    TransactionStatus, NATIVE_ASSET,
};
pub use wallet::{Account, WalletSession};
