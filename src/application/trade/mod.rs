//! Trade execution per DEX protocol.
//!
//! Every swap is an ERC-20 approval followed by a router call. Uniswap pairs
//! approve Permit2 and pay with a signed permit through the Universal Router;
//! SushiSwap and Aerodrome approve their router directly.

mod aerodrome;
pub mod contracts;
mod submit;
mod sushiswap;
mod uniswap;

use std::sync::Arc;

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use tracing::{info, warn};

use self::contracts::IWETH;
pub use self::submit::Submitted;
use crate::adapter::outbound::sqlite::SqliteTransactionLog;
use crate::app::config::ContractsConfig;
use crate::domain::pair::{DexId, Pair};
use crate::domain::trade::{TradePayload, TradeResult, TradeStatus};
use crate::error::{Result, TradeError, TransactionHashes};
use crate::port::outbound::chain::{ChainClient, TxRequest};

/// Deadline for plain router swaps.
const ROUTER_DEADLINE_SECS: i64 = 30;

/// Gas limit of a WETH deposit.
const WRAP_GAS_LIMIT: u64 = 75_000;

/// The protocol used to trade a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeHandler {
    Uniswap { v3: bool },
    SushiSwap,
    Aerodrome,
}

impl TradeHandler {
    /// The handler for a DEX id, or `None` if the exchange is unsupported.
    #[must_use]
    pub fn for_dex(dex: &DexId) -> Option<Self> {
        match (dex.name.as_str(), dex.version.as_str()) {
            ("uniswap", "v2") => Some(Self::Uniswap { v3: false }),
            ("uniswap", "v3") => Some(Self::Uniswap { v3: true }),
            ("sushiswap", "v2") => Some(Self::SushiSwap),
            ("aerodrome", _) => Some(Self::Aerodrome),
            _ => None,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uniswap { v3: false } => "uniswap-v2",
            Self::Uniswap { v3: true } => "uniswap-v3",
            Self::SushiSwap => "sushiswap",
            Self::Aerodrome => "aerodrome",
        }
    }
}

/// Sends approvals and swaps for the configured wallet.
pub struct TradeExecutor {
    chain: Arc<dyn ChainClient>,
    tx_log: SqliteTransactionLog,
    contracts: ContractsConfig,
}

impl TradeExecutor {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        tx_log: SqliteTransactionLog,
        contracts: ContractsConfig,
    ) -> Self {
        Self {
            chain,
            tx_log,
            contracts,
        }
    }

    /// Approves the spender for `amount_in` and swaps.
    ///
    /// A mined but reverted transaction is a failed [`TradeResult`]. A
    /// receipt timeout or failed receipt fetch, or any chain error once the
    /// approval is mined, is a [`TradeError`] carrying the hashes sent so far.
    pub async fn execute(
        &self,
        handler: TradeHandler,
        pair: &Pair,
        payload: &TradePayload,
    ) -> Result<TradeResult> {
        let spender = match handler {
            TradeHandler::Uniswap { .. } => self.contracts.permit2,
            TradeHandler::SushiSwap => self.contracts.sushiswap_router,
            TradeHandler::Aerodrome => self.contracts.aerodrome_router,
        };
        info!(
            pair = %pair.address,
            handler = handler.name(),
            direction = ?payload.direction,
            amount_in = %payload.amount_in,
            min_amount_out = %payload.min_amount_out,
            "Executing trade"
        );

        let details = format!("Allowance {} for {}", payload.symbol_in, payload.amount_in);
        let approve_hash = match self
            .approve(payload.token_in, spender, payload.amount_in, details)
            .await?
        {
            Submitted::Mined(receipt) if receipt.success => receipt.tx_hash.to_string(),
            Submitted::Mined(receipt) => {
                return Ok(TradeResult {
                    allowance_tx: Some(receipt.tx_hash.to_string()),
                    ..TradeResult::failed("Unable to create allowance transaction")
                });
            }
            Submitted::TimedOut(hash) => {
                return Err(TradeError::timeout(format!(
                    "Allowance transaction {hash} timed out"
                ))
                .with_hashes(TransactionHashes {
                    approve: Some(hash),
                    swap: None,
                })
                .into());
            }
            Submitted::Unconfirmed { hash, reason } => {
                return Err(TradeError::execution(format!(
                    "Allowance transaction {hash} receipt unavailable: {reason}"
                ))
                .with_hashes(TransactionHashes {
                    approve: Some(hash),
                    swap: None,
                })
                .into());
            }
        };

        let swapped = match handler {
            TradeHandler::Uniswap { v3 } => self.uniswap_swap(pair, payload, v3).await,
            TradeHandler::SushiSwap => self.sushiswap_swap(payload).await,
            TradeHandler::Aerodrome => self.aerodrome_swap(payload).await,
        };
        let hashes = |swap: Option<String>| TransactionHashes {
            approve: Some(approve_hash.clone()),
            swap,
        };

        match swapped {
            Ok(Submitted::Mined(receipt)) => {
                let (status, message) = if receipt.success {
                    (TradeStatus::Success, String::new())
                } else {
                    (TradeStatus::Failed, "Swap transaction reverted".to_string())
                };
                Ok(TradeResult {
                    status,
                    message,
                    allowance_tx: Some(approve_hash.clone()),
                    swap_tx: Some(receipt.tx_hash.to_string()),
                })
            }
            Ok(Submitted::TimedOut(hash)) => Err(TradeError::timeout(format!(
                "Swap transaction {hash} timed out"
            ))
            .with_hashes(hashes(Some(hash)))
            .into()),
            Ok(Submitted::Unconfirmed { hash, reason }) => Err(TradeError::execution(format!(
                "Swap transaction {hash} receipt unavailable: {reason}"
            ))
            .with_hashes(hashes(Some(hash)))
            .into()),
            Err(err) => {
                warn!(pair = %pair.address, error = %err, "Swap failed after approval");
                Err(TradeError::execution(format!("Swap failed: {err}"))
                    .with_hashes(hashes(None))
                    .into())
            }
        }
    }

    /// Deposits `value` native coin into WETH.
    pub async fn wrap(&self, value: U256) -> Result<Submitted> {
        let fees = self.chain.estimate_fees().await?;
        let tx = TxRequest::call(self.contracts.weth, IWETH::depositCall {}.abi_encode())
            .with_value(value)
            .with_gas_limit(WRAP_GAS_LIMIT)
            .with_fees(fees);
        self.submit(tx, format!("Wrap {value} ETH")).await
    }
}
