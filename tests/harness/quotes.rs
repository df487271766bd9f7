use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use dexbot::error::{Error, Result};
use dexbot::port::outbound::market::{MarketQuote, QuoteSource, UsdPriceSource};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::json;

/// Quote source answering from a settable price table.
#[derive(Clone, Default)]
pub struct FixedQuotes {
    prices: Arc<Mutex<HashMap<Address, Decimal>>>,
}

impl FixedQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, pair: Address, price_native: Decimal) {
        self.prices.lock().insert(pair, price_native);
    }
}

#[async_trait]
impl QuoteSource for FixedQuotes {
    async fn fetch_quotes(&self, pairs: &[Address]) -> Result<Vec<MarketQuote>> {
        let prices = self.prices.lock();
        Ok(pairs
            .iter()
            .filter_map(|pair| {
                prices.get(pair).map(|price| MarketQuote {
                    pair_address: *pair,
                    price_native: *price,
                    raw_data: json!({
                        "pairAddress": pair.to_string(),
                        "priceNative": price.to_string(),
                    }),
                })
            })
            .collect())
    }
}

/// USD price source answering with a settable price, or an error when unset.
#[derive(Clone, Default)]
pub struct FixedUsdPrice {
    price: Arc<Mutex<Option<Decimal>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FixedUsdPrice {
    pub fn set(&self, price: Option<Decimal>) {
        *self.price.lock() = price;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl UsdPriceSource for FixedUsdPrice {
    async fn usd_price(&self, symbol: &str) -> Result<Decimal> {
        self.requests.lock().push(symbol.to_string());
        let price = *self.price.lock();
        price.ok_or_else(|| Error::Parse(format!("no {symbol} price")))
    }
}
