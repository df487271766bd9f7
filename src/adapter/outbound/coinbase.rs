//! Coinbase spot prices, `GET {base_url}/{SYMBOL}-USD/spot`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::config::MarketDataConfig;
use crate::error::{Error, Result};
use crate::port::outbound::market::UsdPriceSource;

#[derive(Debug, Deserialize)]
struct SpotResponse {
    data: SpotPrice,
}

#[derive(Debug, Deserialize)]
struct SpotPrice {
    amount: String,
    currency: String,
}

pub struct CoinbaseClient {
    http: HttpClient,
    base_url: String,
}

impl CoinbaseClient {
    #[must_use]
    pub fn from_config(config: &MarketDataConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            base_url: config.usd_price_url.trim_end_matches('/').to_string(),
        }
    }
}

fn parse_spot(response: SpotResponse) -> Result<Decimal> {
    if response.data.currency != "USD" {
        return Err(Error::Parse(format!(
            "expected a USD spot price, got {}",
            response.data.currency
        )));
    }
    Decimal::from_str(&response.data.amount)
        .map_err(|e| Error::Parse(format!("spot amount {:?}: {e}", response.data.amount)))
}

#[async_trait]
impl UsdPriceSource for CoinbaseClient {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal> {
        let url = format!("{}/{symbol}-USD/spot", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<SpotResponse>()
            .await?;
        let price = parse_spot(response)?;
        debug!(symbol, %price, "Fetched USD spot price");
        Ok(price)
    }
}
