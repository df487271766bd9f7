use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::{evaluate, StrategyContext, StrategyServices};
use crate::domain::strategy::StrategyKind;
use crate::error::{Error, Result};

/// Why a worker iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStep {
    Continue,
    PairDeleted,
    StrategyCleared,
    UnknownStrategy,
}

/// Evaluates one pair's strategy on a fixed interval.
pub struct PairWorker {
    pair: Address,
    services: Arc<StrategyServices>,
    interval: Duration,
}

impl PairWorker {
    pub fn new(pair: Address, services: Arc<StrategyServices>, interval: Duration) -> Self {
        Self {
            pair,
            services,
            interval,
        }
    }

    /// Loops until the pair stops needing a worker, an iteration fails, or
    /// `cancel` turns true.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        info!(pair = %self.pair, "Strategy worker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = cancel.changed() => {
                    if result.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.step(&mut cancel).await {
                        Ok(WorkerStep::Continue) => {}
                        Ok(step) => {
                            info!(pair = %self.pair, ?step, "Strategy worker exiting");
                            break;
                        }
                        Err(err) => {
                            error!(pair = %self.pair, error = %err, "Strategy iteration failed");
                            break;
                        }
                    }
                    if *cancel.borrow() {
                        break;
                    }
                }
            }
        }

        info!(pair = %self.pair, "Strategy worker stopped");
    }

    /// One evaluation: reload the pair, run its strategy, save the state.
    pub async fn step(&self, cancel: &mut watch::Receiver<bool>) -> Result<WorkerStep> {
        let services = &self.services;
        let Some(pair) = services.ledger.get_pair(&self.pair)? else {
            return Ok(WorkerStep::PairDeleted);
        };
        let Some(name) = pair.strategy.clone().filter(|s| !s.is_empty()) else {
            return Ok(WorkerStep::StrategyCleared);
        };
        let kind = match name.parse::<StrategyKind>() {
            Ok(kind) => kind,
            Err(err) => {
                warn!(pair = %self.pair, error = %err, "Unknown strategy");
                return Ok(WorkerStep::UnknownStrategy);
            }
        };

        let base_token = services
            .ledger
            .get_token(&pair.base_address)?
            .ok_or_else(|| Error::Database(format!("base token {} missing", pair.base_address)))?;
        let quote_token = services
            .ledger
            .get_token(&pair.quote_address)?
            .ok_or_else(|| {
                Error::Database(format!("quote token {} missing", pair.quote_address))
            })?;
        let state = services
            .states
            .load(&self.pair, kind)?
            .unwrap_or_else(|| kind.default_state());

        let ctx = StrategyContext {
            latest_quote: services.ledger.latest_quote(&self.pair)?,
            position: services.ledger.get_position(&self.pair)?,
            pair,
            state,
            base_token,
            quote_token,
        };

        let state = evaluate(services, &ctx, cancel).await?;
        services.states.save(&self.pair, &state)?;
        debug!(pair = %self.pair, strategy = %kind, "Strategy evaluated");
        Ok(WorkerStep::Continue)
    }
}
