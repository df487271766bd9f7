//! Tokens, tracked pairs and their price history.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::DomainError;
use crate::error::Result;

/// The native coin is tracked as a token at the zero address.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// An ERC-20 token (or the native coin) with the wallet's last known balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub balance: U256,
    pub latest_price_usd: Option<Decimal>,
}

impl Token {
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }
}

/// Exchange identity, stored as `name:version`. A bare name means `v2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DexId {
    pub name: String,
    pub version: String,
}

impl DexId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl FromStr for DexId {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (name, version) = s.split_once(':').unwrap_or((s, "v2"));
        let name = name.trim().to_ascii_lowercase();
        let version = version.trim().to_ascii_lowercase();
        if name.is_empty() || version.is_empty() {
            return Err(DomainError::InvalidDexId(s.to_string()));
        }
        Ok(Self { name, version })
    }
}

impl fmt::Display for DexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// A tracked base/quote token combination on one exchange and chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub address: Address,
    pub base_address: Address,
    pub quote_address: Address,
    pub dex: DexId,
    pub chain: String,
    /// Strategy name; `None` means no worker should run.
    pub strategy: Option<String>,
    pub message_id: Option<String>,
}

impl Pair {
    #[must_use]
    pub fn has_strategy(&self) -> bool {
        self.strategy.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// One price observation for a pair.
///
/// `price` is the quote token's smallest unit per whole base token.
#[derive(Debug, Clone, PartialEq)]
pub struct PairQuote {
    pub pair_address: Address,
    pub price: U256,
    pub raw_data: serde_json::Value,
    pub data_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl PairQuote {
    /// Builds a quote, hashing `raw_data` for de-duplication.
    pub fn new(
        pair_address: Address,
        price: U256,
        raw_data: serde_json::Value,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let data_hash = content_hash(&raw_data)?;
        Ok(Self {
            pair_address,
            price,
            raw_data,
            data_hash,
            timestamp,
        })
    }
}

/// SHA-256 hex digest of a JSON value's serialized form.
///
/// Object keys are ordered, so equal values always hash the same.
pub fn content_hash(value: &serde_json::Value) -> Result<String> {
    let serialized = serde_json::to_string(value)?;
    Ok(hex::encode(Sha256::digest(serialized.as_bytes())))
}

/// A PnL snapshot recorded when a position's profit swings sharply.
#[derive(Debug, Clone, PartialEq)]
pub struct PairPriceAlert {
    pub pair_address: Address,
    pub price: U256,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
    pub created_at: DateTime<Utc>,
}
