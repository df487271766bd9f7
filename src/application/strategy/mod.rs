//! Per-pair automated strategies.
//!
//! The [`StrategyScheduler`] keeps one [`PairWorker`] running for every pair
//! with a strategy. Each worker iteration rebuilds a [`StrategyContext`] from
//! the ledger, evaluates the pair's strategy and persists the resulting
//! state. Strategies never trade directly: they enqueue a `sell` job on the
//! trade queue and wait, bounded, for the dispatcher to resolve it.

mod prudent_pump;
mod scheduler;
mod stop_loss;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{info, warn};

pub use self::scheduler::StrategyScheduler;
pub use self::worker::{PairWorker, WorkerStep};
use super::settings::TradeSettings;
use crate::adapter::outbound::sqlite::{
    SqliteJobQueue, SqliteLedger, SqliteStrategyStateStore, WaitOutcome,
};
use crate::domain::job::{job_type, JobStatus, NewJob, TradeRequest};
use crate::domain::pair::{Pair, PairQuote, Token};
use crate::domain::position::{position_metric, Position, PositionMetric};
use crate::domain::strategy::StrategyState;
use crate::error::Result;

/// Stores and settings shared by every worker.
pub struct StrategyServices {
    pub ledger: SqliteLedger,
    pub jobs: SqliteJobQueue,
    pub states: SqliteStrategyStateStore,
    pub settings: Arc<TradeSettings>,
    /// Upper bound on waiting for a requested sell to resolve.
    pub sell_wait: Duration,
}

/// Everything a strategy sees for one evaluation.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub pair: Pair,
    pub state: StrategyState,
    pub latest_quote: Option<PairQuote>,
    pub base_token: Token,
    pub quote_token: Token,
    pub position: Option<Position>,
}

impl StrategyContext {
    /// PnL of the current holding, if there is an open position with a
    /// non-zero base balance and a known price.
    pub fn metric(&self) -> Result<Option<PositionMetric>> {
        let (Some(position), Some(quote)) = (&self.position, &self.latest_quote) else {
            return Ok(None);
        };
        if self.base_token.balance.is_zero() {
            return Ok(None);
        }
        Ok(Some(position_metric(
            position.book_value,
            self.base_token.balance,
            self.base_token.decimals,
            quote.price,
            self.quote_token.decimals,
        )?))
    }
}

/// How a requested sell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellOutcome {
    Completed,
    /// The job failed or expired without running.
    Failed,
    /// Nobody picked the job up in time; it was expired unexecuted.
    TimedOut,
    Cancelled,
}

impl StrategyServices {
    /// Enqueues a sell of `value` base units and waits for it to resolve.
    ///
    /// The job carries an `expire_at` matching the wait, so it can never
    /// execute after the strategy has given up on it. A sell already being
    /// executed at that point is waited out rather than counted as failed.
    pub async fn request_sell(
        &self,
        pair: &Pair,
        value: U256,
        slippage: Option<Decimal>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<SellOutcome> {
        let request = TradeRequest {
            pair: pair.address,
            value,
            slippage,
        };
        let expire_at = Utc::now()
            + chrono::Duration::from_std(self.sell_wait).unwrap_or(chrono::Duration::MAX);
        let id = self
            .jobs
            .enqueue(&NewJob::trade(job_type::SELL, &request)?.expiring_at(expire_at))?;
        info!(pair = %pair.address, job_id = id, %value, ?slippage, "Sell requested");

        let outcome = match self.jobs.wait_for_resolution(id, self.sell_wait, cancel).await? {
            WaitOutcome::Resolved(JobStatus::Completed) => SellOutcome::Completed,
            WaitOutcome::Resolved(_) => SellOutcome::Failed,
            WaitOutcome::TimedOut => SellOutcome::TimedOut,
            WaitOutcome::Cancelled => SellOutcome::Cancelled,
        };
        if outcome != SellOutcome::Completed {
            warn!(pair = %pair.address, job_id = id, ?outcome, "Sell did not complete");
        }
        Ok(outcome)
    }
}

/// Runs the context's strategy and returns the state to persist.
pub async fn evaluate(
    services: &StrategyServices,
    ctx: &StrategyContext,
    cancel: &mut watch::Receiver<bool>,
) -> Result<StrategyState> {
    match &ctx.state {
        StrategyState::StopLoss(state) => stop_loss::evaluate(services, ctx, state, cancel)
            .await
            .map(StrategyState::StopLoss),
        StrategyState::PrudentPump(state) => {
            prudent_pump::evaluate(services, ctx, state.clone(), cancel)
                .await
                .map(StrategyState::PrudentPump)
        }
    }
}
