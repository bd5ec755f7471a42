//! Supported chain configuration
//!
//! Each chain has a fixed public RPC endpoint used for read-only calls
//! (balances, allowances, receipts) independent of wallet state, plus the
//! address of the bridge contract deployed on it.
//!
//! # Environment Variable Schema
//!
//! ```text
//! BRIDGE_CHAINS_COUNT=2
//! BRIDGE_CHAIN_1_NAME=ethereum
//! BRIDGE_CHAIN_1_CHAIN_ID=1
//! BRIDGE_CHAIN_1_RPC_URL=https://rpc.ankr.com/eth
//! BRIDGE_CHAIN_1_BRIDGE_ADDRESS=0x...
//! ```

use alloy::primitives::Address;
use eyre::{eyre, Result};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Validates that a URL uses http/https and has a host component.
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        tracing::warn!(
            "{} uses unencrypted http:// — use https:// in production",
            name
        );
    }

    Ok(())
}

/// Configuration for a single chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    /// Human-readable name (e.g., "ethereum", "pulsechain")
    pub name: String,
    /// Native EVM chain ID
    pub chain_id: u64,
    /// Public JSON-RPC endpoint for reads
    pub rpc_url: String,
    /// Bridge contract on this chain; also the ERC-20 spender
    pub bridge_address: Address,
}

impl ChainConfig {
    pub fn new(name: &str, chain_id: u64, rpc_url: &str, bridge_address: Address) -> Self {
        Self {
            name: name.to_string(),
            chain_id,
            rpc_url: rpc_url.to_string(),
            bridge_address,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(eyre!("RPC URL is empty for chain {}", self.name));
        }
        validate_rpc_url(&self.rpc_url, &format!("{}_RPC_URL", self.name))?;

        if self.bridge_address == Address::ZERO {
            return Err(eyre!("Bridge address is zero for chain {}", self.name));
        }

        if self.chain_id == 0 {
            return Err(eyre!("Chain ID is 0 for chain {}", self.name));
        }

        Ok(())
    }
}

/// All configured chains, indexed by native chain ID
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<ChainConfig>,
    by_id: HashMap<u64, usize>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Result<Self> {
        if chains.is_empty() {
            return Err(eyre!("At least one chain must be configured"));
        }

        let mut seen = HashSet::new();
        for chain in &chains {
            chain.validate()?;
            if !seen.insert(chain.chain_id) {
                return Err(eyre!(
                    "Duplicate chain ID: {} (chain: {})",
                    chain.chain_id,
                    chain.name
                ));
            }
        }

        let by_id = chains
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.chain_id, idx))
            .collect();

        Ok(Self { chains, by_id })
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.by_id.get(&chain_id).map(|&idx| &self.chains[idx])
    }

    pub fn get_by_name(&self, name: &str) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.name == name)
    }

    pub fn all(&self) -> &[ChainConfig] {
        &self.chains
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.chain_id).collect()
    }
}

/// Load the chain list from environment variables.
///
/// Required per chain: `BRIDGE_CHAIN_{N}_CHAIN_ID`, `_RPC_URL`, `_BRIDGE_ADDRESS`.
/// Optional: `BRIDGE_CHAIN_{N}_NAME` (default "chain_{N}").
pub fn load_from_env() -> Result<ChainRegistry> {
    let count: usize = std::env::var("BRIDGE_CHAINS_COUNT")
        .map_err(|_| eyre!("BRIDGE_CHAINS_COUNT required"))?
        .parse()
        .map_err(|_| eyre!("Invalid BRIDGE_CHAINS_COUNT — must be a number"))?;

    let mut chains = Vec::with_capacity(count);

    for i in 1..=count {
        let prefix = format!("BRIDGE_CHAIN_{}", i);

        let name =
            std::env::var(format!("{}_NAME", prefix)).unwrap_or_else(|_| format!("chain_{}", i));

        let chain_id: u64 = std::env::var(format!("{}_CHAIN_ID", prefix))
            .map_err(|_| eyre!("Missing {}_CHAIN_ID", prefix))?
            .parse()
            .map_err(|_| eyre!("Invalid {}_CHAIN_ID — must be a u64", prefix))?;

        let rpc_url = std::env::var(format!("{}_RPC_URL", prefix))
            .map_err(|_| eyre!("Missing {}_RPC_URL", prefix))?;

        let bridge_str = std::env::var(format!("{}_BRIDGE_ADDRESS", prefix))
            .map_err(|_| eyre!("Missing {}_BRIDGE_ADDRESS", prefix))?;
        if bridge_str.len() != 42 || !bridge_str.starts_with("0x") {
            return Err(eyre!(
                "Invalid {}_BRIDGE_ADDRESS: {} (expected 0x-prefixed 42-char hex)",
                prefix,
                bridge_str
            ));
        }
        let bridge_address = Address::from_str(&bridge_str)
            .map_err(|e| eyre!("Invalid {}_BRIDGE_ADDRESS: {}", prefix, e))?;

        chains.push(ChainConfig {
            name,
            chain_id,
            rpc_url,
            bridge_address,
        });
    }

    ChainRegistry::new(chains)
}
