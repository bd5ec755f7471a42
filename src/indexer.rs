//! Indexer REST client
//!
//! The indexer correlates the source and destination legs of a transfer by
//! message id. Registration returns the first [`BridgeTransaction`] record,
//! including that id; all later lookups use it instead of the source hash.
//!
//! ## Endpoints
//!
//! - `POST /transaction {txHash, networkId, userAddress}`
//! - `GET /transaction/{messageId}`
//! - `GET /transactions?userAddress=&limit=&offset=`

use alloy::primitives::{Address, TxHash};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::types::BridgeTransaction;

/// Default request timeout
pub const DEFAULT_INDEXER_TIMEOUT: Duration = Duration::from_secs(30);

/// Registration payload for a confirmed source transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub tx_hash: String,
    pub network_id: u64,
    pub user_address: String,
}

impl Registration {
    pub fn new(tx_hash: TxHash, network_id: u64, user: Address) -> Self {
        Self {
            tx_hash: tx_hash.to_string(),
            network_id,
            user_address: user.to_string(),
        }
    }
}

/// Off-chain indexer operations
#[async_trait]
pub trait IndexerApi: Send + Sync {
    /// Register a confirmed source transaction
    async fn register(&self, registration: &Registration) -> Result<BridgeTransaction>;

    /// Current record for `message_id`
    async fn transaction(&self, message_id: &str) -> Result<BridgeTransaction>;

    /// A user's transfer history, newest first as the indexer orders it
    async fn transactions(
        &self,
        user: Address,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BridgeTransaction>>;
}

/// HTTP client for the indexer API
pub struct HttpIndexer {
    base_url: String,
    client: Client,
}

impl HttpIndexer {
    pub fn new(base_url: &str, timeout: Duration) -> eyre::Result<Self> {
        crate::chains::validate_rpc_url(base_url, "INDEXER_URL")?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl IndexerApi for HttpIndexer {
    async fn register(&self, registration: &Registration) -> Result<BridgeTransaction> {
        debug!(
            tx_hash = %registration.tx_hash,
            network_id = registration.network_id,
            "Registering transaction with indexer"
        );

        let response = self
            .client
            .post(self.endpoint("transaction"))
            .json(registration)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BridgeError::IndexerSubmissionFailure(e.to_string()))?;

        response
            .json::<BridgeTransaction>()
            .await
            .map_err(|e| BridgeError::IndexerSubmissionFailure(format!("invalid response: {}", e)))
    }

    async fn transaction(&self, message_id: &str) -> Result<BridgeTransaction> {
        let response = self
            .client
            .get(self.endpoint(&format!("transaction/{}", message_id)))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BridgeError::PollingFailure(e.to_string()))?;

        response
            .json::<BridgeTransaction>()
            .await
            .map_err(|e| BridgeError::PollingFailure(format!("invalid response: {}", e)))
    }

    async fn transactions(
        &self,
        user: Address,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BridgeTransaction>> {
        let response = self
            .client
            .get(self.endpoint("transactions"))
            .query(&[
                ("userAddress", user.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| BridgeError::Rpc(format!("history request failed: {}", e)))?;

        response
            .json::<Vec<BridgeTransaction>>()
            .await
            .map_err(|e| BridgeError::Rpc(format!("invalid history response: {}", e)))
    }
}
