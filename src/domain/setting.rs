//! Named trade settings and their defaults.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::DomainError;

/// A tunable trade parameter stored in the settings table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingName {
    /// Default buy size, in whole quote tokens. Read by the operator front
    /// end when it builds a `buy` job; buy jobs always carry their value.
    BuyAmount,
    /// Default slippage as a fraction.
    Slippage,
    /// Minimum quote-token (WETH) balance required to buy, in whole tokens.
    MinWethRequired,
    /// Minimum native balance kept for gas, in whole ETH.
    MinEthRequired,
    /// PnL percentage at or below which positions are sold.
    StopLoss,
}

impl SettingName {
    pub const ALL: [SettingName; 5] = [
        Self::BuyAmount,
        Self::Slippage,
        Self::MinWethRequired,
        Self::MinEthRequired,
        Self::StopLoss,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyAmount => "BUY_AMOUNT",
            Self::Slippage => "SLIPPAGE",
            Self::MinWethRequired => "MIN_WETH_REQUIRED",
            Self::MinEthRequired => "MIN_ETH_REQUIRED",
            Self::StopLoss => "STOP_LOSS",
        }
    }

    /// Value persisted the first time a setting is read.
    #[must_use]
    pub fn default_value(self) -> Decimal {
        match self {
            Self::BuyAmount => dec!(0.001),
            Self::Slippage => dec!(0.10),
            Self::MinWethRequired => dec!(0.0003),
            Self::MinEthRequired => dec!(0.0005),
            Self::StopLoss => dec!(-20),
        }
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownVariant {
                kind: "setting",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("stop_loss".parse::<SettingName>().unwrap(), SettingName::StopLoss);
        assert!("LEVERAGE".parse::<SettingName>().is_err());
    }

    #[test]
    fn stop_loss_defaults_negative() {
        assert!(SettingName::StopLoss.default_value() < Decimal::ZERO);
    }
}
