//! Trade-queue event handlers.
//!
//! Handlers read the chain and the ledger, send transactions, and return a
//! [`Settlement`] describing the ledger writes. Nothing is written to the
//! ledger here: the dispatcher commits the settlement together with the job's
//! completion, so a failed handler leaves no partial update behind.

mod balances;
mod buy;
mod sell;
mod wrap;

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use super::dispatcher::JobHandler;
use super::settings::TradeSettings;
use super::trade::{TradeExecutor, TradeHandler};
use crate::adapter::outbound::sqlite::SqliteLedger;
use crate::app::config::ChainConfig;
use crate::domain::job::{ChatMessage, Event, Job, TradeRequest};
use crate::domain::money::{to_decimal, to_units};
use crate::domain::pair::{Pair, PairQuote, Token};
use crate::domain::setting::SettingName;
use crate::domain::settlement::Settlement;
use crate::domain::trade::{TradePayload, TradeResult};
use crate::error::{Error, Result, TradeError, TradeInformation, TransactionHashes};
use crate::port::outbound::chain::ChainClient;
use crate::port::outbound::market::QuoteSource;

/// Handles `update-balances`, `buy`, `sell` and `wrap` events.
pub struct EventHandlers {
    ledger: SqliteLedger,
    settings: Arc<TradeSettings>,
    chain: Arc<dyn ChainClient>,
    quotes: Arc<dyn QuoteSource>,
    executor: TradeExecutor,
    chain_config: ChainConfig,
    weth: Address,
}

impl EventHandlers {
    pub fn new(
        ledger: SqliteLedger,
        settings: Arc<TradeSettings>,
        chain: Arc<dyn ChainClient>,
        quotes: Arc<dyn QuoteSource>,
        executor: TradeExecutor,
        chain_config: ChainConfig,
        weth: Address,
    ) -> Self {
        Self {
            ledger,
            settings,
            chain,
            quotes,
            executor,
            chain_config,
            weth,
        }
    }
}

#[async_trait]
impl JobHandler for EventHandlers {
    async fn handle(&self, job: &Job, event: &Event) -> Result<Settlement> {
        debug!(job_id = job.id, event = event.name(), "Handling event");
        match event {
            Event::UpdateBalances(request) => self.update_balances(request).await,
            Event::Buy(request) => self.buy(job, request).await,
            Event::Sell(request) => self.sell(job, request).await,
            Event::Wrap(request) => self.wrap(job, request).await,
            Event::Chat(_) => Err(Error::UnknownEventType(format!(
                "chat on the trade queue (job {})",
                job.id
            ))),
        }
    }
}

/// Everything a buy or sell needs, resolved and checked.
struct TradeContext {
    pair: Pair,
    base: Token,
    quote: Token,
    handler: TradeHandler,
    slippage: Decimal,
}

impl EventHandlers {
    /// Loads the pair and its tokens and checks the exchange and chain.
    fn trade_context(&self, request: &TradeRequest) -> Result<TradeContext> {
        let pair = self
            .ledger
            .get_pair(&request.pair)?
            .ok_or_else(|| TradeError::business(format!("Pair {} doesn't exist", request.pair)))?;
        let base = self.require_token(&pair.base_address)?;
        let quote = self.require_token(&pair.quote_address)?;

        if pair.chain != self.chain_config.name {
            return Err(
                TradeError::business(format!("Chain {} isn't supported", pair.chain)).into(),
            );
        }
        let handler = TradeHandler::for_dex(&pair.dex)
            .ok_or_else(|| TradeError::business(format!("Dex {} isn't supported", pair.dex)))?;

        let slippage = match request.slippage {
            Some(slippage) => slippage,
            None => self.settings.get(SettingName::Slippage)?,
        };

        Ok(TradeContext {
            pair,
            base,
            quote,
            handler,
            slippage,
        })
    }

    fn require_token(&self, address: &Address) -> Result<Token> {
        Ok(self
            .ledger
            .get_token(address)?
            .ok_or_else(|| TradeError::business(format!("Token {address} doesn't exist")))?)
    }

    /// Fetches a current quote for the pair and stores it.
    ///
    /// The market price (quote per base, whole tokens) becomes quote smallest
    /// units per whole base token.
    async fn fresh_quote(&self, pair: &Pair, quote: &Token) -> Result<PairQuote> {
        let market = self
            .quotes
            .fetch_quotes(&[pair.address])
            .await?
            .into_iter()
            .find(|q| q.pair_address == pair.address)
            .ok_or_else(|| {
                TradeError::business(format!("Pair quote for {} not found", pair.address))
            })?;

        let price = to_units(market.price_native, u32::from(quote.decimals))?;
        if price.is_zero() {
            return Err(
                TradeError::business(format!("Pair {} has no price", pair.address)).into(),
            );
        }
        let quote = PairQuote::new(pair.address, price, market.raw_data, Utc::now())?;
        self.ledger.insert_quote(&quote)?;
        Ok(quote)
    }

    /// The wallet's balance of `token`, native coin included.
    async fn balance_of(&self, token: &Token) -> Result<U256> {
        let wallet = self.chain.wallet();
        if token.is_native() {
            self.chain.native_balance(wallet).await
        } else {
            self.chain.token_balance(token.address, wallet).await
        }
    }

    /// Rejects the trade if the wallet can't pay for gas.
    async fn ensure_gas_balance(&self) -> Result<()> {
        let minimum = to_units(self.settings.get(SettingName::MinEthRequired)?, 18)?;
        let balance = self.chain.native_balance(self.chain.wallet()).await?;
        if balance < minimum {
            return Err(TradeError::business("Balance of ETH under minimum requirement").into());
        }
        Ok(())
    }

    /// Chat embed announcing a mined swap.
    fn swap_message(
        &self,
        job: &Job,
        title: String,
        message: String,
        result: &TradeResult,
    ) -> ChatMessage {
        let swap_tx = result.swap_tx.clone().unwrap_or_default();
        ChatMessage::embed(title, message)
            .with_url(self.chain_config.tx_link(&swap_tx))
            .with_field("Swap Tx id", swap_tx)
            .with_field(
                "Approve Tx id",
                result.allowance_tx.clone().unwrap_or_default(),
            )
            .with_field("Event Id", job.id.to_string())
    }
}

/// Diagnostics for a trade attempt.
fn trade_information(
    job: &Job,
    handler: TradeHandler,
    payload: &TradePayload,
    slippage: Decimal,
    chain_id: u64,
) -> TradeInformation {
    TradeInformation {
        event_id: job.id,
        trade_handler: Some(handler.name().to_string()),
        amount: payload.amount_in.to_string(),
        min_amount: Some(payload.min_amount_out.to_string()),
        slippage: Some(slippage.to_string()),
        source_address: Some(payload.token_in.to_string()),
        destination_address: Some(payload.token_out.to_string()),
        chain_id: Some(chain_id),
    }
}

/// Attaches diagnostics to a trade error; other errors pass through.
fn with_information(err: Error, information: &TradeInformation) -> Error {
    match err {
        Error::Trade(trade) => Error::Trade(trade.with_information(information.clone())),
        other => other,
    }
}

/// A failed trade result as an execution error.
fn failed_trade(prefix: &str, result: &TradeResult, information: &TradeInformation) -> Error {
    TradeError::execution(format!("{prefix} {}", result.message))
        .with_hashes(hashes(result))
        .with_information(information.clone())
        .into()
}

fn hashes(result: &TradeResult) -> TransactionHashes {
    TransactionHashes {
        approve: result.allowance_tx.clone(),
        swap: result.swap_tx.clone(),
    }
}

/// Human-readable amount, e.g. `1.5` for `1_500_000` at 6 decimals.
fn display_amount(amount: U256, decimals: u8) -> String {
    to_decimal(amount, u32::from(decimals))
        .map(|value| value.normalize().to_string())
        .unwrap_or_else(|_| amount.to_string())
}
