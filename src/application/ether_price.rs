//! Keeps the USD price of ETH and WETH current on their token rows.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::adapter::outbound::sqlite::SqliteLedger;
use crate::domain::pair::NATIVE_TOKEN;
use crate::error::Result;
use crate::port::outbound::market::UsdPriceSource;

/// WETH trades one-to-one with ETH, so both rows get the ETH price.
const PRICE_SYMBOL: &str = "ETH";

pub struct EtherPriceUpdater {
    ledger: SqliteLedger,
    source: Arc<dyn UsdPriceSource>,
    weth: Address,
    interval: Duration,
}

impl EtherPriceUpdater {
    pub fn new(
        ledger: SqliteLedger,
        source: Arc<dyn UsdPriceSource>,
        weth: Address,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            source,
            weth,
            interval,
        }
    }

    /// Fetches the ETH/USD price and writes it to the ETH and WETH rows.
    ///
    /// Returns `None` without fetching when no ETH token is stored.
    pub async fn run_once(&self) -> Result<Option<Decimal>> {
        if self.ledger.get_token(&NATIVE_TOKEN)?.is_none() {
            debug!("No ETH token stored, price refresh skipped");
            return Ok(None);
        }
        let price = self.source.usd_price(PRICE_SYMBOL).await?;
        self.ledger.set_token_price_usd(&NATIVE_TOKEN, price)?;
        if !self.ledger.set_token_price_usd(&self.weth, price)? {
            debug!(weth = %self.weth, "WETH token not stored, only ETH updated");
        }
        debug!(%price, "ETH price refreshed");
        Ok(Some(price))
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "ETH price updater started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        error!(error = %err, "ETH/USD price refresh failed");
                    }
                }
            }
        }

        info!("ETH price updater stopped");
    }
}
