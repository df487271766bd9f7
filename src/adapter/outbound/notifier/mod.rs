//! Notification adapters.
//!
//! Implements the [`Notifier`] port. The registry fans one message out to
//! every registered backend.

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::job::{ChatMessage, ChatMessageType};
use crate::error::Result;
use crate::port::outbound::notifier::Notifier;

/// Registry of notifiers.
#[derive(Default)]
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for NotifierRegistry {
    /// Delivers to every backend; fails if any backend failed.
    async fn send(&self, message: &ChatMessage) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.send(message).await {
                warn!(notifier = notifier.name(), error = %e, "Notifier failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn name(&self) -> &'static str {
        "registry"
    }
}

/// A logging notifier that writes chat messages via tracing.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &ChatMessage) -> Result<()> {
        let title = message.title.as_deref().unwrap_or_default();
        let url = message.url.as_deref().unwrap_or_default();
        match message.message_type {
            ChatMessageType::Text => info!(message = %message.message, "Chat"),
            ChatMessageType::Embed => info!(
                title = %title,
                message = %message.message,
                url = %url,
                fields = message.fields.len(),
                "Chat embed"
            ),
            ChatMessageType::Error => error!(
                message = %message.message,
                source_event_id = ?message.source_event_id,
                "Chat error"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingNotifier {
        count: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        async fn send(&self, _message: &ChatMessage) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Connection("down".into()));
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn registry_delivers_to_all() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
            fail: false,
        }));
        registry.register(Box::new(LogNotifier));
        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
            fail: false,
        }));

        registry.send(&ChatMessage::text("hello")).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn registry_reports_failure_after_trying_everyone() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
            fail: true,
        }));
        registry.register(Box::new(CountingNotifier {
            count: count.clone(),
            fail: false,
        }));

        assert!(registry.send(&ChatMessage::text("hello")).await.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
