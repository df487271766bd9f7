//! Market data port.

use alloy_primitives::Address;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;

/// A quote as reported by the market-data provider.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuote {
    pub pair_address: Address,
    /// Price of one whole base token in whole quote tokens.
    pub price_native: Decimal,
    /// Provider payload, persisted verbatim and hashed for de-duplication.
    pub raw_data: serde_json::Value,
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the current quote of each pair. Pairs the provider does not
    /// know are omitted from the result.
    async fn fetch_quotes(&self, pairs: &[Address]) -> Result<Vec<MarketQuote>>;
}

#[async_trait]
pub trait UsdPriceSource: Send + Sync {
    /// Spot price of one whole `symbol` in US dollars.
    async fn usd_price(&self, symbol: &str) -> Result<Decimal>;
}
