//! Bridge data model
//!
//! Token reference data, the curated token-pair list, user intents, approval
//! state and the indexer's transaction record.

use alloy::primitives::{Address, TxHash, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{BridgeError, Result};

/// Reserved address denoting a chain's native asset
pub const NATIVE_ASSET: Address = Address::ZERO;

// ============================================================================
// Tokens
// ============================================================================

/// Immutable token reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeToken {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: Address,
    pub chain_id: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BridgeToken {
    /// Whether this token is the chain's native asset (sentinel address)
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_ASSET
    }
}

/// The same logical asset on two chains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub from: BridgeToken,
    pub to: BridgeToken,
}

impl TokenPair {
    /// The pair for the return direction
    pub fn reverse(&self) -> TokenPair {
        TokenPair {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

/// Curated, ordered token-pair list
///
/// Lookups return the first match in declaration order, so an ambiguous
/// symbol always resolves to the same pair.
#[derive(Debug, Clone, Default)]
pub struct TokenPairs {
    pairs: Vec<TokenPair>,
}

impl TokenPairs {
    pub fn new(pairs: Vec<TokenPair>) -> Self {
        Self { pairs }
    }

    pub fn push(&mut self, pair: TokenPair) {
        self.pairs.push(pair);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First pair whose source token matches `symbol` (case-insensitive) on `from_chain`
    pub fn find_by_symbol(&self, symbol: &str, from_chain: u64) -> Option<&TokenPair> {
        self.pairs.iter().find(|p| {
            p.from.chain_id == from_chain && p.from.symbol.eq_ignore_ascii_case(symbol)
        })
    }

    /// First pair bridging `token` from `from_chain` to `to_chain`
    pub fn find_for_token(
        &self,
        token: Address,
        from_chain: u64,
        to_chain: u64,
    ) -> Option<&TokenPair> {
        self.pairs.iter().find(|p| {
            p.from.address == token && p.from.chain_id == from_chain && p.to.chain_id == to_chain
        })
    }
}

// ============================================================================
// Amounts
// ============================================================================

/// Parse a human decimal amount ("1.5") into raw units for `decimals`
///
/// Exact: rejects signs, exponents, empty parts and more fractional digits
/// than the token supports.
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256> {
    let amount = amount.trim();
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(BridgeError::InvalidIntent(format!(
            "amount '{}' is empty",
            amount
        )));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(BridgeError::InvalidIntent(format!(
            "amount '{}' is not a decimal number",
            amount
        )));
    }
    if frac.len() > decimals as usize {
        return Err(BridgeError::InvalidIntent(format!(
            "amount '{}' has {} fractional digits, token supports {}",
            amount,
            frac.len(),
            decimals
        )));
    }

    let mut digits = String::with_capacity(whole.len() + decimals as usize);
    digits.push_str(whole);
    digits.push_str(frac);
    digits.extend(std::iter::repeat('0').take(decimals as usize - frac.len()));
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10)
        .map_err(|e| BridgeError::InvalidIntent(format!("amount '{}' out of range: {}", amount, e)))
}

/// Render raw units as a decimal string, trimming trailing zeros
pub fn format_amount(raw: U256, decimals: u8) -> String {
    let digits = raw.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, frac) = padded.split_at(padded.len() - decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac)
    }
}

// ============================================================================
// Intents and approval state
// ============================================================================

/// A user's request to move `amount` of `token` to `receiver` on another chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeIntent {
    pub from_chain_id: u64,
    pub to_chain_id: u64,
    pub token: BridgeToken,
    /// Human decimal string, interpreted with `token.decimals`
    pub amount: String,
    pub receiver: Address,
}

impl BridgeIntent {
    /// Validate the intent and return the amount in raw units
    pub fn validate(&self) -> Result<U256> {
        if self.from_chain_id == self.to_chain_id {
            return Err(BridgeError::InvalidIntent(format!(
                "source and destination chain are both {}",
                self.from_chain_id
            )));
        }
        if self.token.chain_id != self.from_chain_id {
            return Err(BridgeError::InvalidIntent(format!(
                "token {} lives on chain {}, not source chain {}",
                self.token.symbol, self.token.chain_id, self.from_chain_id
            )));
        }
        if self.receiver == Address::ZERO {
            return Err(BridgeError::InvalidIntent(
                "receiver is the zero address".to_string(),
            ));
        }

        let wei = parse_amount(&self.amount, self.token.decimals)?;
        if wei.is_zero() {
            return Err(BridgeError::InvalidIntent(
                "amount must be greater than zero".to_string(),
            ));
        }
        Ok(wei)
    }
}

/// Allowance status for one (token, owner, spender) triple
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApprovalState {
    pub required: bool,
    pub in_flight: bool,
    pub tx_hash: Option<TxHash>,
}

impl ApprovalState {
    pub fn not_required() -> Self {
        Self::default()
    }
}

// ============================================================================
// Indexer record
// ============================================================================

/// Indexer-side transfer status; `Executed` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Executed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Executed => "executed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transfer record as created and updated by the indexer
///
/// Always replaced wholesale by the newest response, never merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeTransaction {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub message_id: String,
    pub source_chain_id: u64,
    pub target_chain_id: u64,
    pub source_tx_hash: String,
    #[serde(default)]
    pub target_tx_hash: Option<String>,
    pub token_address: String,
    /// Raw units as a decimal string
    pub amount: String,
    pub status: TransactionStatus,
    pub source_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub target_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
