//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable overrides
//! for sensitive values like `WALLET_PRIVATE_KEY`.

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

mod chain;
mod logging;
mod service;

pub use chain::{ChainConfig, ContractsConfig};
pub use logging::LoggingConfig;
pub use service::{DatabaseConfig, IntervalsConfig, MarketDataConfig, StrategyConfig};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub intervals: IntervalsConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse configuration from TOML content and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        // Secrets come from the environment only
        config.chain.private_key = std::env::var("WALLET_PRIVATE_KEY").ok();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or see [`Config::parse_toml`].
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.is_empty() {
            return Err(ConfigError::MissingField { field: "rpc_url" }.into());
        }
        if self.database.url.is_empty() {
            return Err(ConfigError::MissingField { field: "database.url" }.into());
        }
        if self.chain.receipt_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "receipt_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.strategy.sell_wait_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sell_wait_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        // A strategy sell covers an approval and a swap, each waiting up to
        // one receipt timeout.
        let receipt_pair = self.chain.receipt_timeout_secs.saturating_mul(2);
        if self.strategy.sell_wait_timeout_secs <= receipt_pair {
            return Err(ConfigError::InvalidValue {
                field: "sell_wait_timeout_secs",
                reason: format!(
                    "must exceed twice receipt_timeout_secs ({})",
                    self.chain.receipt_timeout_secs
                ),
            }
            .into());
        }
        let intervals = &self.intervals;
        if [
            intervals.trade_poll_ms,
            intervals.chat_poll_ms,
            intervals.scheduler_ms,
            intervals.worker_ms,
            intervals.quote_ingest_ms,
            intervals.ether_price_ms,
        ]
        .contains(&0)
        {
            return Err(ConfigError::InvalidValue {
                field: "intervals",
                reason: "intervals must be greater than 0".to_string(),
            }
            .into());
        }
        if self.market_data.quote_retention_days <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "quote_retention_days",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
