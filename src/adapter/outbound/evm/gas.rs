//! EIP-1559 fee estimation from recent fee history.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_provider::{DynProvider, Provider};
use alloy_rpc_types_eth::BlockNumberOrTag;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ChainError, Result};
use crate::port::outbound::chain::GasFees;

/// Blocks sampled per estimate.
const HISTORY_BLOCKS: u64 = 4;

/// Reward percentiles requested; the median column drives the tip.
const REWARD_PERCENTILES: [f64; 3] = [25.0, 50.0, 75.0];
const MEDIAN_COLUMN: usize = 1;

/// Estimates are reused for this long.
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Fee-history based gas oracle with a short-lived cache.
#[derive(Clone)]
pub struct GasOracle {
    provider: DynProvider,
    cached: Arc<Mutex<Option<(Instant, GasFees)>>>,
}

impl GasOracle {
    #[must_use]
    pub fn new(provider: DynProvider) -> Self {
        Self {
            provider,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Current fee estimate, served from cache when fresh.
    ///
    /// A failed refresh falls back to the last good estimate if one exists.
    pub async fn estimate(&self) -> Result<GasFees> {
        let last = *self.cached.lock();
        if let Some((at, fees)) = last {
            if at.elapsed() < CACHE_TTL {
                return Ok(fees);
            }
        }

        let provider = self.provider.clone();
        let history = retry_async(
            move |_| {
                let provider = provider.clone();
                async move {
                    provider
                        .get_fee_history(
                            HISTORY_BLOCKS,
                            BlockNumberOrTag::Pending,
                            &REWARD_PERCENTILES,
                        )
                        .await
                }
            },
            3,
            Duration::from_millis(100),
        )
        .await;

        match history {
            Ok(history) => {
                let fees = fees_from_history(&history.base_fee_per_gas, history.reward.as_deref())?;
                debug!(
                    base_fee = fees.base_fee,
                    priority_fee = fees.priority_fee,
                    "Gas fees refreshed"
                );
                *self.cached.lock() = Some((Instant::now(), fees));
                Ok(fees)
            }
            Err(e) => match last {
                Some((_, fees)) => {
                    warn!(error = %e, "Fee history failed, reusing last estimate");
                    Ok(fees)
                }
                None => Err(ChainError::Rpc(format!("fee history failed: {e}")).into()),
            },
        }
    }
}

/// Average base fee plus 10% overhead, and the average median tip.
pub fn fees_from_history(base_fees: &[u128], rewards: Option<&[Vec<u128>]>) -> Result<GasFees> {
    if base_fees.is_empty() {
        return Err(ChainError::Rpc("empty fee history".into()).into());
    }
    let count = base_fees.len() as u128;
    let average_base = base_fees.iter().fold(0u128, |acc, f| acc.saturating_add(*f)) / count;
    let base_fee = average_base.saturating_add(average_base / 10);

    let tips: Vec<u128> = rewards
        .unwrap_or_default()
        .iter()
        .filter_map(|block| block.get(MEDIAN_COLUMN).copied())
        .collect();
    let priority_fee = if tips.is_empty() {
        0
    } else {
        tips.iter().fold(0u128, |acc, t| acc.saturating_add(*t)) / tips.len() as u128
    };

    Ok(GasFees {
        base_fee,
        priority_fee,
    })
}

/// Retry an async operation with exponential backoff.
async fn retry_async<F, Fut, T, E>(mut op: F, attempts: usize, initial_delay: Duration) -> std::result::Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let mut delay = initial_delay;
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(_) if attempt < attempts => {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
