//! Notifier port for operator notifications.
//!
//! Chat jobs drained from the chat queue are handed to a [`Notifier`].
//! Rendering is entirely the notifier's concern.

use async_trait::async_trait;

use crate::domain::job::ChatMessage;
use crate::error::Result;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one message to the operator channel.
    async fn send(&self, message: &ChatMessage) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str;
}
