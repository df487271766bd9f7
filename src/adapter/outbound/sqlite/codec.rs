//! Conversions between domain values and their stored text form.

use std::str::FromStr;

use alloy_primitives::{Address, I256, U256};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::error::{Error, Result};

/// Fixed-width UTC timestamps sort lexicographically in creation order.
pub fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("timestamp {value:?}: {e}")))
}

pub fn parse_opt_ts(value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    value.map(parse_ts).transpose()
}

/// Addresses are keyed by their checksummed form.
pub fn addr(value: &Address) -> String {
    value.to_checksum(None)
}

pub fn parse_addr(value: &str) -> Result<Address> {
    Address::from_str(value).map_err(|e| Error::Parse(format!("address {value:?}: {e}")))
}

pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str(value).map_err(|e| Error::Parse(format!("amount {value:?}: {e}")))
}

pub fn parse_i256(value: &str) -> Result<I256> {
    I256::from_dec_str(value).map_err(|e| Error::Parse(format!("amount {value:?}: {e}")))
}

pub fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|e| Error::Parse(format!("decimal {value:?}: {e}")))
}

pub fn parse_json(value: &str) -> Result<serde_json::Value> {
    serde_json::from_str(value).map_err(|e| Error::Parse(format!("json: {e}")))
}
