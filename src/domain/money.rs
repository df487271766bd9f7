//! Fixed-point helpers for on-chain amounts.
//!
//! Ledger values are integers in a token's smallest unit ([`U256`]). They are
//! turned into [`Decimal`] only at calculation boundaries, and turned back
//! with truncation toward zero.

use alloy_primitives::{I256, U256};
use rust_decimal::Decimal;

use super::error::DomainError;

/// Maximum scale a [`Decimal`] can carry.
const MAX_SCALE: u32 = 28;

/// `10^exp` as a [`U256`].
#[must_use]
pub fn pow10(exp: u32) -> U256 {
    U256::from(10u64).pow(U256::from(exp))
}

/// Converts an integer amount into a decimal with `decimals` fractional digits.
///
/// `to_decimal(1_500_000, 6)` is `1.5`.
pub fn to_decimal(amount: U256, decimals: u32) -> Result<Decimal, DomainError> {
    if decimals > MAX_SCALE {
        return Err(DomainError::UnsupportedDecimals { decimals });
    }
    let mut value: Decimal = amount
        .to_string()
        .parse()
        .map_err(|_| DomainError::AmountOverflow {
            amount: amount.to_string(),
        })?;
    value
        .set_scale(decimals)
        .map_err(|_| DomainError::UnsupportedDecimals { decimals })?;
    Ok(value)
}

/// Converts a decimal amount into smallest units, truncating toward zero.
///
/// `to_units(dec!(0.001), 18)` is `10^15`.
pub fn to_units(value: Decimal, decimals: u32) -> Result<U256, DomainError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DomainError::NegativeAmount { amount: value });
    }
    let mantissa = U256::from(value.mantissa().unsigned_abs());
    mantissa
        .checked_mul(pow10(decimals))
        .map(|scaled| scaled / pow10(value.scale()))
        .ok_or_else(|| DomainError::AmountOverflow {
            amount: value.to_string(),
        })
}

/// Converts a signed decimal into signed smallest units, truncating toward zero.
pub fn to_signed_units(value: Decimal, decimals: u32) -> Result<I256, DomainError> {
    let magnitude = I256::try_from(to_units(value.abs(), decimals)?).map_err(|_| {
        DomainError::AmountOverflow {
            amount: value.to_string(),
        }
    })?;
    Ok(if value.is_sign_negative() {
        -magnitude
    } else {
        magnitude
    })
}

/// Applies `amount × (1 − slippage)` exactly, truncating toward zero.
pub fn apply_slippage(amount: U256, slippage: Decimal) -> Result<U256, DomainError> {
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(DomainError::InvalidSlippage { slippage });
    }
    let factor = Decimal::ONE - slippage;
    let mantissa = U256::from(factor.mantissa().unsigned_abs());
    amount
        .checked_mul(mantissa)
        .map(|scaled| scaled / pow10(factor.scale()))
        .ok_or_else(|| DomainError::AmountOverflow {
            amount: amount.to_string(),
        })
}

/// Serde adapter writing amounts as decimal strings.
///
/// Reading accepts a decimal string, a `0x` hex string, or a JSON integer.
pub mod amount {
    use std::fmt;

    use alloy_primitives::U256;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or integer string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom(format!("negative amount: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            v.trim().parse::<U256>().map_err(E::custom)
        }
    }
}
