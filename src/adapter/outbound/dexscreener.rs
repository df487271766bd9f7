//! DexScreener market-data client.
//!
//! Fetches pair snapshots from `GET {base_url}/pairs/{chain}/{a,b,...}`.
//! Each snapshot is kept verbatim as the quote's raw data.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::app::config::MarketDataConfig;
use crate::error::Result;
use crate::port::outbound::market::{MarketQuote, QuoteSource};

/// DexScreener accepts at most this many pair addresses per request.
const MAX_PAIRS_PER_REQUEST: usize = 30;

#[derive(Debug, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<serde_json::Value>>,
}

pub struct DexScreenerClient {
    http: HttpClient,
    base_url: String,
    chain: String,
    retry_max_attempts: u32,
    retry_backoff_ms: u64,
}

impl DexScreenerClient {
    #[must_use]
    pub fn from_config(config: &MarketDataConfig, chain: &str) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chain: chain.to_string(),
            retry_max_attempts: config.retry_max_attempts,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    async fn get_with_retry(&self, url: &str) -> Result<PairsResponse> {
        let max_attempts = self.retry_max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = match self.http.get(url).send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => response.json::<PairsResponse>().await,
                    Err(err) => return Err(err.into()),
                },
                Err(err) => Err(err),
            };

            match result {
                Ok(parsed) => return Ok(parsed),
                Err(err) if attempt < max_attempts && (err.is_timeout() || err.is_connect()) => {
                    let backoff = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                    warn!(error = %err, attempt, max_attempts, "DexScreener request failed, retrying");
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Extracts a quote from one DexScreener pair object.
fn parse_pair(raw: serde_json::Value) -> Option<MarketQuote> {
    let pair_address = raw
        .get("pairAddress")
        .and_then(|v| v.as_str())
        .and_then(|s| Address::from_str(s).ok())?;
    let price_native = match raw.get("priceNative")? {
        serde_json::Value::String(s) => Decimal::from_str(s).ok()?,
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
        _ => return None,
    };
    Some(MarketQuote {
        pair_address,
        price_native,
        raw_data: raw,
    })
}

#[async_trait]
impl QuoteSource for DexScreenerClient {
    async fn fetch_quotes(&self, pairs: &[Address]) -> Result<Vec<MarketQuote>> {
        let mut quotes = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(MAX_PAIRS_PER_REQUEST) {
            let addresses: Vec<String> = chunk.iter().map(|a| a.to_string()).collect();
            let url = format!(
                "{}/pairs/{}/{}",
                self.base_url,
                self.chain,
                addresses.join(",")
            );
            let response = self.get_with_retry(&url).await?;
            let found: Vec<MarketQuote> = response
                .pairs
                .unwrap_or_default()
                .into_iter()
                .filter_map(parse_pair)
                .filter(|quote| chunk.contains(&quote.pair_address))
                .collect();
            debug!(requested = chunk.len(), found = found.len(), "Fetched DexScreener quotes");
            quotes.extend(found);
        }
        Ok(quotes)
    }
}
