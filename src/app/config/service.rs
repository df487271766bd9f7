//! Database, market data, loop interval and strategy configuration.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`. `DATABASE_URL` overrides it.
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "dexbot.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

/// Market-data clients and quote retention settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Attempts per request, first try included.
    pub retry_max_attempts: u32,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
    pub quote_retention_days: i64,
    /// PnL% swing since the last alert that raises a new one.
    pub alert_threshold_percent: rust_decimal::Decimal,
    /// Coinbase spot price endpoint, used for the ETH/USD price.
    pub usd_price_url: String,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dexscreener.com/latest/dex".into(),
            timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_backoff_ms: 500,
            quote_retention_days: 31,
            alert_threshold_percent: rust_decimal::Decimal::TEN,
            usd_price_url: "https://api.coinbase.com/v2/prices".into(),
        }
    }
}

/// Poll intervals of the long-running loops, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IntervalsConfig {
    pub trade_poll_ms: u64,
    pub chat_poll_ms: u64,
    pub scheduler_ms: u64,
    pub worker_ms: u64,
    pub quote_ingest_ms: u64,
    pub ether_price_ms: u64,
}

impl IntervalsConfig {
    #[must_use]
    pub fn trade_poll(&self) -> Duration {
        Duration::from_millis(self.trade_poll_ms)
    }

    #[must_use]
    pub fn chat_poll(&self) -> Duration {
        Duration::from_millis(self.chat_poll_ms)
    }

    #[must_use]
    pub fn scheduler(&self) -> Duration {
        Duration::from_millis(self.scheduler_ms)
    }

    #[must_use]
    pub fn worker(&self) -> Duration {
        Duration::from_millis(self.worker_ms)
    }

    #[must_use]
    pub fn quote_ingest(&self) -> Duration {
        Duration::from_millis(self.quote_ingest_ms)
    }

    #[must_use]
    pub fn ether_price(&self) -> Duration {
        Duration::from_millis(self.ether_price_ms)
    }
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            trade_poll_ms: 200,
            chat_poll_ms: 2_000,
            scheduler_ms: 2_000,
            worker_ms: 250,
            quote_ingest_ms: 10_000,
            ether_price_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// How long a strategy's sell job may wait in the queue before it is
    /// expired. Must exceed twice `chain.receipt_timeout_secs`.
    pub sell_wait_timeout_secs: u64,
}

impl StrategyConfig {
    #[must_use]
    pub fn sell_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.sell_wait_timeout_secs)
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            sell_wait_timeout_secs: 300,
        }
    }
}
