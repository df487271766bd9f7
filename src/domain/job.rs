//! Persisted jobs and the typed events built from them.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::money::amount;
use crate::error::{Error, Result};

/// A named lane of jobs processed serially by one dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    Chat,
    Trade,
}

impl Queue {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat-bot",
            Self::Trade => "trade-bot",
        }
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Queue {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chat-bot" => Ok(Self::Chat),
            "trade-bot" => Ok(Self::Trade),
            other => Err(DomainError::UnknownVariant {
                kind: "queue",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a job.
///
/// Transitions only move forward:
/// `Pending -> Acked -> {Completed, Failed}`, `Pending -> Expired`, and
/// `Pending -> Failed` for jobs whose event cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Acked,
    Completed,
    Failed,
    Expired,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Acked => "ACKED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
        }
    }

    /// Whether the job has left the queue for good.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }

    /// Statuses a job may be in immediately before moving to `self`.
    #[must_use]
    pub const fn allowed_predecessors(self) -> &'static [JobStatus] {
        match self {
            Self::Pending => &[],
            Self::Acked | Self::Expired => &[Self::Pending],
            Self::Completed => &[Self::Acked],
            Self::Failed => &[Self::Pending, Self::Acked],
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACKED" => Ok(Self::Acked),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "EXPIRED" => Ok(Self::Expired),
            other => Err(DomainError::UnknownVariant {
                kind: "job status",
                value: other.to_string(),
            }),
        }
    }
}

/// Job type names as stored in the queue.
pub mod job_type {
    pub const UPDATE_BALANCES: &str = "update-balances";
    pub const BUY: &str = "buy";
    pub const SELL: &str = "sell";
    pub const WRAP: &str = "wrap";
    pub const CHAT: &str = "chat";
}

/// A persisted unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub queue: Queue,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub acked_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
    pub execution_data: Option<serde_json::Value>,
}

impl Job {
    /// A job is stale once `now` reaches its `expire_at`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|expire_at| expire_at <= now)
    }
}

/// A job to be enqueued.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub queue: Queue,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub expire_at: Option<DateTime<Utc>>,
}

impl NewJob {
    pub fn new(queue: Queue, job_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            queue,
            job_type: job_type.into(),
            payload,
            expire_at: None,
        }
    }

    #[must_use]
    pub fn expiring_at(mut self, expire_at: DateTime<Utc>) -> Self {
        self.expire_at = Some(expire_at);
        self
    }

    /// A chat notification job.
    pub fn chat(message: &ChatMessage) -> Result<Self> {
        Ok(Self::new(
            Queue::Chat,
            job_type::CHAT,
            serde_json::to_value(message)?,
        ))
    }

    /// A buy or sell job on the trade queue.
    pub fn trade(job_type: &str, request: &TradeRequest) -> Result<Self> {
        Ok(Self::new(
            Queue::Trade,
            job_type,
            serde_json::to_value(request)?,
        ))
    }
}

/// Payload of `update-balances`. An empty list means every known token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBalancesRequest {
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// Payload of `buy` and `sell`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub pair: Address,
    #[serde(with = "amount")]
    pub value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<Decimal>,
}

/// Payload of `wrap`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapRequest {
    #[serde(with = "amount")]
    pub value: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageType {
    Text,
    Embed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Payload of `chat`: an operator notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_type: ChatMessageType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ChatField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<i64>,
}

impl ChatMessage {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message_type: ChatMessageType::Text,
            message: message.into(),
            title: None,
            url: None,
            fields: Vec::new(),
            source_event_id: None,
        }
    }

    pub fn embed(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message_type: ChatMessageType::Embed,
            title: Some(title.into()),
            ..Self::text(message)
        }
    }

    pub fn error(message: impl Into<String>, source_event_id: i64) -> Self {
        Self {
            message_type: ChatMessageType::Error,
            source_event_id: Some(source_event_id),
            ..Self::text(message)
        }
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(ChatField {
            name: name.into(),
            value: value.into(),
            inline: true,
        });
        self
    }
}

/// A typed event constructed from a job's stored payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UpdateBalances(UpdateBalancesRequest),
    Buy(TradeRequest),
    Sell(TradeRequest),
    Wrap(WrapRequest),
    Chat(ChatMessage),
}

impl Event {
    /// Builds the event for a job.
    ///
    /// # Errors
    /// Returns [`Error::UnknownEventType`] for a type with no constructor, or a
    /// JSON error when the payload does not match the type's schema.
    pub fn from_job(job: &Job) -> Result<Self> {
        let payload = job.payload.clone();
        let event = match job.job_type.as_str() {
            job_type::UPDATE_BALANCES => Self::UpdateBalances(serde_json::from_value(payload)?),
            job_type::BUY => Self::Buy(serde_json::from_value(payload)?),
            job_type::SELL => Self::Sell(serde_json::from_value(payload)?),
            job_type::WRAP => Self::Wrap(serde_json::from_value(payload)?),
            job_type::CHAT => Self::Chat(serde_json::from_value(payload)?),
            other => return Err(Error::UnknownEventType(other.to_string())),
        };
        Ok(event)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateBalances(_) => job_type::UPDATE_BALANCES,
            Self::Buy(_) => job_type::BUY,
            Self::Sell(_) => job_type::SELL,
            Self::Wrap(_) => job_type::WRAP,
            Self::Chat(_) => job_type::CHAT,
        }
    }
}
