//! Normalized trade requests handed to exchange executors.

use alloy_primitives::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
}

/// An exact-input swap of `amount_in` of `token_in` for at least
/// `min_amount_out` of `token_out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradePayload {
    pub direction: TradeDirection,
    pub token_in: Address,
    pub token_out: Address,
    pub symbol_in: String,
    pub symbol_out: String,
    pub amount_in: U256,
    pub min_amount_out: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Success,
    Failed,
}

/// Outcome reported by an exchange executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeResult {
    pub status: TradeStatus,
    pub message: String,
    pub allowance_tx: Option<String>,
    pub swap_tx: Option<String>,
}

impl TradeResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TradeStatus::Failed,
            message: message.into(),
            allowance_tx: None,
            swap_tx: None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TradeStatus::Success
    }
}

/// Audit entry for a transaction the bot sent.
///
/// Recording the same hash again merges: fields left `None` keep their
/// stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub block_number: Option<u64>,
    pub status: Option<String>,
    pub details: Option<String>,
    /// Transaction parameters without calldata.
    pub params: Option<serde_json::Value>,
}
