//! Shared in-memory chain and indexer stubs for integration tests

#![allow(dead_code)]

use alloy::primitives::{address, Address, TxHash, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use bridge_orchestrator::{
    BridgeError, BridgeOrchestrator, BridgeToken, BridgeTransaction, ChainConfig, ChainGateway,
    ChainRegistry, IndexerApi, OrchestratorConfig, Registration, TrackerState,
    TransactionStatus, TxReceipt, WalletSession, WriteCall,
};
use bridge_orchestrator::wallet::Account;

pub const ETHEREUM: u64 = 1;
pub const PULSECHAIN: u64 = 369;

pub const ETH_BRIDGE: Address = address!("1111111111111111111111111111111111111111");
pub const PLS_BRIDGE: Address = address!("3690000000000000000000000000000000000369");
pub const USER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");

pub const GAS_ESTIMATE: u64 = 65_000;

pub fn registry() -> ChainRegistry {
    ChainRegistry::new(vec![
        ChainConfig::new("ethereum", ETHEREUM, "https://eth.example.org", ETH_BRIDGE),
        ChainConfig::new("pulsechain", PULSECHAIN, "https://pulse.example.org", PLS_BRIDGE),
    ])
    .expect("valid registry")
}

pub fn token(symbol: &str, chain_id: u64, address: Address, decimals: u8) -> BridgeToken {
    BridgeToken {
        name: symbol.to_string(),
        symbol: symbol.to_string(),
        decimals,
        address,
        chain_id,
        tags: vec![],
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Indexer record as returned right after registration
pub fn tx_record(message_id: &str, status: TransactionStatus) -> BridgeTransaction {
    BridgeTransaction {
        id: "1".to_string(),
        message_id: message_id.to_string(),
        source_chain_id: ETHEREUM,
        target_chain_id: PULSECHAIN,
        source_tx_hash: format!("0x{}", "ab".repeat(32)),
        target_tx_hash: match status {
            TransactionStatus::Executed => Some(format!("0x{}", "cd".repeat(32))),
            _ => None,
        },
        token_address: Address::ZERO.to_string(),
        amount: "1000000000000000000".to_string(),
        status,
        source_timestamp: fixed_time(),
        target_timestamp: None,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

fn hash_from_counter(n: u64) -> TxHash {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&n.to_be_bytes());
    TxHash::from(bytes)
}

// ============================================================================
// Chain gateway stub
// ============================================================================

/// A transaction accepted by the stub node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTx {
    pub chain_id: u64,
    pub from: Address,
    pub call: WriteCall,
    pub gas_limit: u64,
    pub tx_hash: TxHash,
}

#[derive(Debug, Default)]
pub struct GatewayState {
    /// (chain, token, owner, spender) -> allowance
    pub allowances: HashMap<(u64, Address, Address, Address), U256>,
    pub native_balances: HashMap<(u64, Address), U256>,
    pub token_balances: HashMap<(u64, Address, Address), U256>,
    /// Lookups per hash that return `None` before the receipt appears
    pub pending_lookups: u32,
    /// Mined receipts report status 0
    pub revert: bool,
    pub estimate_fails: bool,
    /// Error message returned by `send`
    pub send_error: Option<String>,
    pub sent: Vec<SentTx>,
    pub receipt_calls: u32,
    lookups: HashMap<TxHash, u32>,
    nonce: u64,
}

#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap()
    }

    pub fn set_allowance(&self, chain_id: u64, token: Address, spender: Address, amount: U256) {
        self.state()
            .allowances
            .insert((chain_id, token, USER, spender), amount);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.state().sent.clone()
    }

    pub fn receipt_calls(&self) -> u32 {
        self.state().receipt_calls
    }
}

#[async_trait]
impl ChainGateway for MockGateway {
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256, BridgeError> {
        Ok(self
            .state()
            .native_balances
            .get(&(chain_id, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn token_balance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
    ) -> Result<U256, BridgeError> {
        Ok(self
            .state()
            .token_balances
            .get(&(chain_id, token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, BridgeError> {
        Ok(self
            .state()
            .allowances
            .get(&(chain_id, token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn estimate_gas(
        &self,
        _chain_id: u64,
        _from: Address,
        _call: &WriteCall,
    ) -> Result<u64, BridgeError> {
        if self.state().estimate_fails {
            return Err(BridgeError::Rpc(
                "execution reverted: gas required exceeds allowance".to_string(),
            ));
        }
        Ok(GAS_ESTIMATE)
    }

    async fn send(
        &self,
        chain_id: u64,
        from: Address,
        call: &WriteCall,
        gas_limit: u64,
    ) -> Result<TxHash, BridgeError> {
        let mut state = self.state();
        if let Some(err) = &state.send_error {
            return Err(bridge_orchestrator::gateway::write_error(err));
        }

        state.nonce += 1;
        let tx_hash = hash_from_counter(state.nonce);
        if let WriteCall::Approve {
            token,
            spender,
            amount,
        } = call
        {
            state
                .allowances
                .insert((chain_id, *token, from, *spender), *amount);
        }
        state.sent.push(SentTx {
            chain_id,
            from,
            call: call.clone(),
            gas_limit,
            tx_hash,
        });
        Ok(tx_hash)
    }

    async fn transaction_receipt(
        &self,
        _chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, BridgeError> {
        let mut state = self.state();
        state.receipt_calls += 1;
        let pending = state.pending_lookups;
        let success = !state.revert;
        let seen = state.lookups.entry(tx_hash).or_insert(0);
        *seen += 1;
        if *seen <= pending {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            tx_hash,
            block_number: Some(19_000_000),
            success,
        }))
    }
}

// ============================================================================
// Indexer stub
// ============================================================================

#[derive(Debug)]
pub struct IndexerState {
    pub register_error: Option<String>,
    pub registered: Vec<Registration>,
    /// Scripted poll responses; the last status repeats once drained
    pub script: VecDeque<Result<TransactionStatus, String>>,
    pub last_status: TransactionStatus,
    pub fetched: Vec<String>,
    pub history: Vec<BridgeTransaction>,
    pub history_queries: Vec<(Address, u32, u32)>,
}

impl Default for IndexerState {
    fn default() -> Self {
        Self {
            register_error: None,
            registered: Vec::new(),
            script: VecDeque::new(),
            last_status: TransactionStatus::Pending,
            fetched: Vec::new(),
            history: Vec::new(),
            history_queries: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockIndexer {
    state: Mutex<IndexerState>,
}

impl MockIndexer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, IndexerState> {
        self.state.lock().unwrap()
    }

    pub fn script(&self, statuses: &[TransactionStatus]) {
        self.state()
            .script
            .extend(statuses.iter().copied().map(Ok));
    }

    pub fn fetches(&self) -> usize {
        self.state().fetched.len()
    }
}

#[async_trait]
impl IndexerApi for MockIndexer {
    async fn register(
        &self,
        registration: &Registration,
    ) -> Result<BridgeTransaction, BridgeError> {
        let mut state = self.state();
        if let Some(err) = &state.register_error {
            return Err(BridgeError::IndexerSubmissionFailure(err.clone()));
        }
        state.registered.push(registration.clone());
        let mut record = tx_record(
            &format!("msg-{}", state.registered.len()),
            TransactionStatus::Pending,
        );
        record.source_tx_hash = registration.tx_hash.clone();
        Ok(record)
    }

    async fn transaction(&self, message_id: &str) -> Result<BridgeTransaction, BridgeError> {
        let mut state = self.state();
        state.fetched.push(message_id.to_string());
        let status = match state.script.pop_front() {
            Some(Ok(status)) => {
                state.last_status = status;
                status
            }
            Some(Err(e)) => return Err(BridgeError::PollingFailure(e)),
            None => state.last_status,
        };
        Ok(tx_record(message_id, status))
    }

    async fn transactions(
        &self,
        user: Address,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<BridgeTransaction>, BridgeError> {
        let mut state = self.state();
        state.history_queries.push((user, limit, offset));
        Ok(state
            .history
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type TestOrchestrator = BridgeOrchestrator<MockGateway, MockIndexer>;

pub fn orchestrator(
    gateway: &Arc<MockGateway>,
    indexer: &Arc<MockIndexer>,
    chain_id: u64,
    config: OrchestratorConfig,
) -> TestOrchestrator {
    BridgeOrchestrator::new(
        Arc::clone(gateway),
        Arc::clone(indexer),
        registry(),
        WalletSession::connect(Account::new(USER), chain_id),
        config,
    )
}

/// Wait until the tracker stops polling and return the final state
pub async fn wait_until_idle(rx: &mut watch::Receiver<TrackerState>) -> TrackerState {
    rx.wait_for(|s| !s.polling)
        .await
        .expect("tracker state channel closed")
        .clone()
}
