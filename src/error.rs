use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors raised by the blockchain client.
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// The transaction was broadcast but no receipt arrived in time.
    /// Callers may retry; the transaction may still land.
    #[error("timed out waiting for receipt of {tx_hash}")]
    Timeout { tx_hash: String },

    /// The transaction was broadcast but fetching its receipt failed.
    #[error("receipt of {tx_hash} unavailable: {reason}")]
    Receipt { tx_hash: String, reason: String },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

/// Distinguishes a precondition violation from a failed on-chain trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeErrorKind {
    /// A named precondition failed before any transaction was sent.
    BusinessRule,
    /// A transaction was sent but the trade did not happen.
    Execution,
    /// A transaction was sent but its receipt never arrived in time.
    Timeout,
}

/// Transaction hashes produced by a trade attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionHashes {
    pub approve: Option<String>,
    pub swap: Option<String>,
}

impl TransactionHashes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.approve.is_none() && self.swap.is_none()
    }
}

/// Structured diagnostics attached to a failed trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TradeInformation {
    pub event_id: i64,
    pub trade_handler: Option<String>,
    pub amount: String,
    pub min_amount: Option<String>,
    pub slippage: Option<String>,
    pub source_address: Option<String>,
    pub destination_address: Option<String>,
    pub chain_id: Option<u64>,
}

/// The single failure kind surfaced by event handlers for trade problems.
#[derive(Debug, Clone)]
pub struct TradeError {
    pub kind: TradeErrorKind,
    pub message: String,
    pub transaction_hashes: TransactionHashes,
    pub trade_information: Option<TradeInformation>,
}

impl TradeError {
    /// A precondition failure. No transaction was sent.
    pub fn business(message: impl Into<String>) -> Self {
        Self {
            kind: TradeErrorKind::BusinessRule,
            message: message.into(),
            transaction_hashes: TransactionHashes::default(),
            trade_information: None,
        }
    }

    /// A trade that was attempted on-chain but did not succeed.
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: TradeErrorKind::Execution,
            ..Self::business(message)
        }
    }

    /// The trade's outcome is unknown: a receipt wait ran out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TradeErrorKind::Timeout,
            ..Self::business(message)
        }
    }

    #[must_use]
    pub fn with_hashes(mut self, hashes: TransactionHashes) -> Self {
        self.transaction_hashes = hashes;
        self
    }

    #[must_use]
    pub fn with_information(mut self, information: TradeInformation) -> Self {
        self.trade_information = Some(information);
        self
    }
}

impl fmt::Display for TradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TradeError {}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: String,
        to: &'static str,
    },

    #[error("unknown event type: {0}")]
    UnknownEventType(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        Error::Connection(err.to_string())
    }
}
