//! Strategy identities and their persisted state.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// The closed set of strategies a pair can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    StopLoss,
    PrudentPump,
}

impl StrategyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StopLoss => "stop_loss",
            Self::PrudentPump => "prudent_pump",
        }
    }

    /// Fresh state for a pair that has never run this strategy.
    #[must_use]
    pub fn default_state(self) -> StrategyState {
        match self {
            Self::StopLoss => StrategyState::StopLoss(StopLossState::default()),
            Self::PrudentPump => StrategyState::PrudentPump(PrudentPumpState::default()),
        }
    }

    /// Decodes persisted state for this strategy.
    pub fn decode_state(self, data: &str) -> serde_json::Result<StrategyState> {
        Ok(match self {
            Self::StopLoss => StrategyState::StopLoss(serde_json::from_str(data)?),
            Self::PrudentPump => StrategyState::PrudentPump(serde_json::from_str(data)?),
        })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop_loss" => Ok(Self::StopLoss),
            "prudent_pump" => Ok(Self::PrudentPump),
            other => Err(DomainError::UnknownVariant {
                kind: "strategy",
                value: other.to_string(),
            }),
        }
    }
}

/// Stop-loss keeps no memory between iterations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopLossState {}

/// Peak tracking and retry bookkeeping for the prudent-pump strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrudentPumpState {
    pub highest_profit: Decimal,
    pub retry_count: u32,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyState {
    StopLoss(StopLossState),
    PrudentPump(PrudentPumpState),
}

impl StrategyState {
    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::StopLoss(_) => StrategyKind::StopLoss,
            Self::PrudentPump(_) => StrategyKind::PrudentPump,
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        match self {
            Self::StopLoss(state) => serde_json::to_string(state),
            Self::PrudentPump(state) => serde_json::to_string(state),
        }
    }
}
