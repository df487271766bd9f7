//! Blockchain client port.
//!
//! The engine treats the RPC client as a black box offering balance reads,
//! read-only calls, fee and gas estimation, hash signing and
//! sign-and-send with a bounded receipt wait. Failures are either
//! [`ChainError::Timeout`](crate::error::ChainError::Timeout), which callers
//! may retry, or hard RPC errors.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// EIP-1559 fee estimate, in wei per gas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasFees {
    pub base_fee: u128,
    pub priority_fee: u128,
}

impl GasFees {
    /// `maxFeePerGas` for a transaction built from this estimate.
    #[must_use]
    pub fn max_fee(&self) -> u128 {
        self.base_fee.saturating_add(self.priority_fee)
    }
}

/// A transaction to sign and broadcast from the bot's wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl TxRequest {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    #[must_use]
    pub fn with_fees(mut self, fees: GasFees) -> Self {
        self.max_fee_per_gas = Some(fees.max_fee());
        self.max_priority_fee_per_gas = Some(fees.priority_fee);
        self
    }
}

/// A mined transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the signing wallet.
    fn wallet(&self) -> Address;

    fn chain_id(&self) -> u64;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    /// Executes a read-only call and returns the raw return data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes>;

    async fn estimate_fees(&self) -> Result<GasFees>;

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64>;

    /// Signs, broadcasts and waits for the receipt.
    ///
    /// # Errors
    /// Returns `ChainError::Timeout` carrying the hash when the receipt does
    /// not arrive within the configured window, and `ChainError::Receipt`
    /// carrying the hash when the transaction was broadcast but its receipt
    /// could not be fetched.
    async fn send_transaction(&self, tx: TxRequest) -> Result<TxReceipt>;

    /// Signs a 32-byte digest, returning the 65-byte `r || s || v` signature.
    fn sign_hash(&self, hash: B256) -> Result<Bytes>;
}
