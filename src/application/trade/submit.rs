//! Sending approvals and swaps, with every attempt written to the audit log.

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use serde_json::json;
use tracing::{info, warn};

use super::contracts::IERC20;
use super::TradeExecutor;
use crate::domain::trade::TransactionRecord;
use crate::error::{ChainError, Error, Result};
use crate::port::outbound::chain::{TxReceipt, TxRequest};

/// Gas ceiling for every swap.
pub(super) const SWAP_GAS_LIMIT: u64 = 250_000;

/// Added on top of the node's estimate for approvals.
const APPROVE_GAS_MARGIN: u64 = 10_000;

/// What came of a sent transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Mined(TxReceipt),
    TimedOut(String),
    /// Broadcast, but the receipt could not be fetched.
    Unconfirmed { hash: String, reason: String },
}

impl Submitted {
    pub fn hash(&self) -> String {
        match self {
            Self::Mined(receipt) => receipt.tx_hash.to_string(),
            Self::TimedOut(hash) | Self::Unconfirmed { hash, .. } => hash.clone(),
        }
    }
}

impl TradeExecutor {
    /// ERC-20 `approve(spender, amount)` with an estimated gas limit.
    pub(super) async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
        details: String,
    ) -> Result<Submitted> {
        let data = IERC20::approveCall { spender, amount }.abi_encode();
        let fees = self.chain.estimate_fees().await?;
        let tx = TxRequest::call(token, data).with_fees(fees);
        let gas = self.chain.estimate_gas(&tx).await?;
        let tx = tx.with_gas_limit(gas.saturating_add(APPROVE_GAS_MARGIN));
        self.submit(tx, details).await
    }

    /// A router call under the fixed swap gas ceiling.
    pub(super) async fn swap(
        &self,
        router: Address,
        data: Vec<u8>,
        details: String,
    ) -> Result<Submitted> {
        let fees = self.chain.estimate_fees().await?;
        let tx = TxRequest::call(router, data)
            .with_gas_limit(SWAP_GAS_LIMIT)
            .with_fees(fees);
        self.submit(tx, details).await
    }

    /// Sends `tx` and records the outcome. Every broadcast transaction gets a
    /// row, including timeouts and failed receipt fetches.
    pub(crate) async fn submit(&self, tx: TxRequest, details: String) -> Result<Submitted> {
        let params = sanitized_params(&tx);
        let to = tx.to;

        match self.chain.send_transaction(tx).await {
            Ok(receipt) => {
                let status = if receipt.success { "success" } else { "reverted" };
                self.tx_log.record(&TransactionRecord {
                    hash: receipt.tx_hash.to_string(),
                    block_number: receipt.block_number,
                    status: Some(status.to_string()),
                    details: Some(details),
                    params: Some(params),
                })?;
                info!(tx_hash = %receipt.tx_hash, %to, status, "Transaction mined");
                Ok(Submitted::Mined(receipt))
            }
            Err(Error::Chain(ChainError::Timeout { tx_hash })) => {
                self.tx_log.record(&TransactionRecord {
                    hash: tx_hash.clone(),
                    block_number: None,
                    status: Some("timeout".to_string()),
                    details: Some(details),
                    params: Some(params),
                })?;
                warn!(%tx_hash, %to, "Transaction receipt timed out");
                Ok(Submitted::TimedOut(tx_hash))
            }
            Err(Error::Chain(ChainError::Receipt { tx_hash, reason })) => {
                self.tx_log.record(&TransactionRecord {
                    hash: tx_hash.clone(),
                    block_number: None,
                    status: Some("error".to_string()),
                    details: Some(details),
                    params: Some(params),
                })?;
                warn!(%tx_hash, %to, %reason, "Transaction receipt unavailable");
                Ok(Submitted::Unconfirmed {
                    hash: tx_hash,
                    reason,
                })
            }
            Err(err) => Err(err),
        }
    }
}

/// Transaction parameters for the audit log. Calldata is left out.
fn sanitized_params(tx: &TxRequest) -> serde_json::Value {
    json!({
        "to": tx.to,
        "value": tx.value.to_string(),
        "gas": tx.gas_limit,
        "maxFeePerGas": tx.max_fee_per_gas.map(|fee| fee.to_string()),
        "maxPriorityFeePerGas": tx.max_priority_fee_per_gas.map(|fee| fee.to_string()),
        "dataLength": tx.data.len(),
    })
}
