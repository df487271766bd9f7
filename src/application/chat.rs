//! Relays chat jobs to the configured notifiers.

use std::sync::Arc;

use async_trait::async_trait;

use super::dispatcher::JobHandler;
use crate::domain::job::{Event, Job};
use crate::domain::settlement::Settlement;
use crate::error::{Error, Result};
use crate::port::outbound::notifier::Notifier;

pub struct ChatRelay {
    notifier: Arc<dyn Notifier>,
}

impl ChatRelay {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl JobHandler for ChatRelay {
    async fn handle(&self, job: &Job, event: &Event) -> Result<Settlement> {
        let Event::Chat(message) = event else {
            return Err(Error::UnknownEventType(format!(
                "{} on the chat queue (job {})",
                event.name(),
                job.id
            )));
        };
        self.notifier.send(message).await?;
        Ok(Settlement::default())
    }
}
