//! Domain validation errors.
//!
//! Returned when converting between ledger integers and decimals, or when a
//! stored string does not name a known domain value.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value does not fit the decimal representation used for calculations.
    #[error("amount out of range: {amount}")]
    AmountOverflow { amount: String },

    /// Ledger amounts are unsigned; a negative decimal cannot become one.
    #[error("amount must not be negative, got {amount}")]
    NegativeAmount { amount: rust_decimal::Decimal },

    /// Slippage is a fraction in `[0, 1]`.
    #[error("slippage must be between 0 and 1, got {slippage}")]
    InvalidSlippage { slippage: rust_decimal::Decimal },

    #[error("token decimals {decimals} exceed the supported precision")]
    UnsupportedDecimals { decimals: u32 },

    #[error("invalid DEX identifier: {0:?}")]
    InvalidDexId(String),

    #[error("unknown {kind}: {value:?}")]
    UnknownVariant { kind: &'static str, value: String },
}
