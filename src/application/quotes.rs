//! Periodic quote ingestion with retention and PnL-swing alerts.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::U256;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::adapter::outbound::sqlite::{SqliteJobQueue, SqliteLedger};
use crate::app::config::MarketDataConfig;
use crate::domain::job::{ChatMessage, NewJob};
use crate::domain::money::to_units;
use crate::domain::pair::{Pair, PairPriceAlert, PairQuote};
use crate::domain::position::position_metric;
use crate::error::Result;
use crate::port::outbound::market::QuoteSource;

/// Counts from one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub stored: usize,
    pub duplicates: usize,
    pub purged: usize,
    pub alerts: usize,
}

pub struct QuoteIngestor {
    ledger: SqliteLedger,
    jobs: SqliteJobQueue,
    source: Arc<dyn QuoteSource>,
    config: MarketDataConfig,
    interval: Duration,
}

impl QuoteIngestor {
    pub fn new(
        ledger: SqliteLedger,
        jobs: SqliteJobQueue,
        source: Arc<dyn QuoteSource>,
        config: MarketDataConfig,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            jobs,
            source,
            config,
            interval,
        }
    }

    /// Fetches quotes for every pair, stores the new ones, purges expired
    /// history and raises price alerts.
    pub async fn run_once(&self) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let pairs = self.ledger.list_pairs()?;

        if !pairs.is_empty() {
            let addresses: Vec<_> = pairs.iter().map(|pair| pair.address).collect();
            let now = Utc::now();
            for market in self.source.fetch_quotes(&addresses).await? {
                let Some(pair) = pairs.iter().find(|p| p.address == market.pair_address) else {
                    continue;
                };
                let Some(quote_token) = self.ledger.get_token(&pair.quote_address)? else {
                    warn!(pair = %pair.address, "Quote token unknown, quote skipped");
                    continue;
                };
                let price = to_units(market.price_native, u32::from(quote_token.decimals))?;
                let quote = PairQuote::new(pair.address, price, market.raw_data, now)?;

                if self.ledger.insert_quote(&quote)? {
                    report.stored += 1;
                    if self.check_price_alert(pair, &quote)? {
                        report.alerts += 1;
                    }
                } else {
                    report.duplicates += 1;
                }
            }
        }

        let cutoff = Utc::now() - chrono::Duration::days(self.config.quote_retention_days);
        report.purged = self.ledger.purge_quotes_before(cutoff)?;

        debug!(?report, "Quote ingestion pass");
        Ok(report)
    }

    /// Records an alert and notifies the operator when the position's PnL%
    /// moved more than the threshold since the previous alert.
    fn check_price_alert(&self, pair: &Pair, quote: &PairQuote) -> Result<bool> {
        let Some(position) = self.ledger.get_position(&pair.address)? else {
            return Ok(false);
        };
        let (Some(base), Some(quote_token)) = (
            self.ledger.get_token(&pair.base_address)?,
            self.ledger.get_token(&pair.quote_address)?,
        ) else {
            return Ok(false);
        };
        if base.balance == U256::ZERO {
            return Ok(false);
        }

        let metric = position_metric(
            position.book_value,
            base.balance,
            base.decimals,
            quote.price,
            quote_token.decimals,
        )?;
        let swung = match self.ledger.latest_price_alert(&pair.address)? {
            Some(last) => {
                (metric.pnl_percent - last.pnl_percent).abs() > self.config.alert_threshold_percent
            }
            None => true,
        };
        if !swung {
            return Ok(false);
        }

        self.ledger.insert_price_alert(&PairPriceAlert {
            pair_address: pair.address,
            price: quote.price,
            pnl: metric.pnl,
            pnl_percent: metric.pnl_percent,
            created_at: quote.timestamp,
        })?;
        let message = ChatMessage::embed(
            format!("{} price alert", base.symbol),
            format!(
                "PnL {}% ({} {})",
                metric.pnl_percent.round_dp(2),
                metric.pnl.round_dp(8).normalize(),
                quote_token.symbol
            ),
        )
        .with_field("Pair", pair.address.to_string())
        .with_field("Market value", metric.market_value.round_dp(8).normalize().to_string())
        .with_field("Price paid", metric.price_paid.normalize().to_string());
        self.jobs.enqueue(&NewJob::chat(&message)?)?;
        info!(pair = %pair.address, pnl_percent = %metric.pnl_percent.round_dp(4), "Price alert raised");
        Ok(true)
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Quote ingestor started");
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
                        error!(error = %err, "Quote ingestion failed");
                    }
                }
            }
        }

        info!("Quote ingestor stopped");
    }
}
