//! Orchestrator configuration
//!
//! Loaded from environment variables (a `.env` file is honoured). Chains use
//! the `BRIDGE_CHAIN_{N}_*` schema described in [`crate::chains`].

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::approval::ResetRequiredTokens;
use crate::chains::{self, ChainRegistry};
use crate::confirmation::{ConfirmationConfig, DEFAULT_RECEIPT_POLL_INTERVAL};
use crate::gateway::DEFAULT_FALLBACK_GAS_LIMIT;
use crate::indexer::DEFAULT_INDEXER_TIMEOUT;
use crate::progress::DEFAULT_PROGRESS_WINDOW;
use crate::tracker::{TrackerConfig, DEFAULT_STATUS_POLL_INTERVAL};

/// Behavioural settings for the orchestrator and its components
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub confirmation: ConfirmationConfig,
    pub tracker: TrackerConfig,
    /// Gas limit used when estimation fails
    pub fallback_gas_limit: u64,
    /// Heuristic window for progress projection
    pub progress_window: Duration,
    pub reset_tokens: ResetRequiredTokens,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            confirmation: ConfirmationConfig::default(),
            tracker: TrackerConfig::default(),
            fallback_gas_limit: DEFAULT_FALLBACK_GAS_LIMIT,
            progress_window: DEFAULT_PROGRESS_WINDOW,
            reset_tokens: ResetRequiredTokens::default(),
        }
    }
}

/// Process configuration
#[derive(Clone)]
pub struct Config {
    pub chains: ChainRegistry,
    /// Wallet signing key (hex, 0x-prefixed)
    pub private_key: String,
    pub indexer_url: String,
    pub indexer_timeout: Duration,
    pub orchestrator: OrchestratorConfig,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("chains", &self.chains)
            .field("private_key", &"<redacted>")
            .field("indexer_url", &self.indexer_url)
            .field("indexer_timeout", &self.indexer_timeout)
            .field("orchestrator", &self.orchestrator)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let chains = chains::load_from_env()?;

        let private_key =
            env::var("BRIDGE_PRIVATE_KEY").map_err(|_| eyre!("BRIDGE_PRIVATE_KEY required"))?;
        if private_key.len() != 66 || !private_key.starts_with("0x") {
            return Err(eyre!(
                "Invalid BRIDGE_PRIVATE_KEY format (expected 0x-prefixed 66-char hex)"
            ));
        }

        let indexer_url = env::var("INDEXER_URL").map_err(|_| eyre!("INDEXER_URL required"))?;
        chains::validate_rpc_url(&indexer_url, "INDEXER_URL")?;

        let indexer_timeout = Duration::from_secs(
            parse_or("INDEXER_TIMEOUT_SECS", DEFAULT_INDEXER_TIMEOUT.as_secs())?,
        );

        let confirmation = ConfirmationConfig {
            poll_interval: Duration::from_millis(parse_or(
                "RECEIPT_POLL_INTERVAL_MS",
                DEFAULT_RECEIPT_POLL_INTERVAL.as_millis() as u64,
            )?),
            max_attempts: parse_opt("RECEIPT_MAX_ATTEMPTS")?,
        };

        let tracker = TrackerConfig {
            poll_interval: Duration::from_millis(parse_or(
                "STATUS_POLL_INTERVAL_MS",
                DEFAULT_STATUS_POLL_INTERVAL.as_millis() as u64,
            )?),
            stop_on_failed: parse_or("STATUS_STOP_ON_FAILED", false)?,
        };

        let reset_tokens = match env::var("RESET_APPROVAL_TOKENS") {
            Ok(list) => parse_reset_tokens(&list)?,
            Err(_) => ResetRequiredTokens::default(),
        };

        Ok(Self {
            chains,
            private_key,
            indexer_url,
            indexer_timeout,
            orchestrator: OrchestratorConfig {
                confirmation,
                tracker,
                fallback_gas_limit: parse_or("FALLBACK_GAS_LIMIT", DEFAULT_FALLBACK_GAS_LIMIT)?,
                progress_window: Duration::from_secs(parse_or(
                    "PROGRESS_WINDOW_SECS",
                    DEFAULT_PROGRESS_WINDOW.as_secs(),
                )?),
                reset_tokens,
            },
        })
    }
}

/// Parse a comma-separated `chainId:address` list
///
/// An empty string yields an empty list, disabling the reset check.
pub fn parse_reset_tokens(list: &str) -> Result<ResetRequiredTokens> {
    let mut tokens = ResetRequiredTokens::empty();
    for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (chain, token) = entry.split_once(':').ok_or_else(|| {
            eyre!(
                "Invalid RESET_APPROVAL_TOKENS entry '{}': expected chainId:address",
                entry
            )
        })?;
        let chain_id: u64 = chain.trim().parse().wrap_err_with(|| {
            format!("Invalid chain id in RESET_APPROVAL_TOKENS entry '{}'", entry)
        })?;
        let token = Address::from_str(token.trim()).wrap_err_with(|| {
            format!("Invalid address in RESET_APPROVAL_TOKENS entry '{}'", entry)
        })?;
        tokens.insert(chain_id, token);
    }
    Ok(tokens)
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| eyre!("Invalid {}: '{}'", key, v)),
        Err(_) => Ok(default),
    }
}

fn parse_opt<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| eyre!("Invalid {}: '{}'", key, v)),
        Err(_) => Ok(None),
    }
}
