use std::sync::Arc;

use async_trait::async_trait;
use dexbot::domain::job::ChatMessage;
use dexbot::error::{Error, Result};
use dexbot::port::outbound::notifier::Notifier;
use parking_lot::Mutex;

/// Collects delivered chat messages; optionally fails every delivery.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<ChatMessage>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &ChatMessage) -> Result<()> {
        if self.fail {
            return Err(Error::Connection("chat backend down".into()));
        }
        self.messages.lock().push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
