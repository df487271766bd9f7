//! Queue dispatcher: takes the oldest pending job of one queue, builds its
//! event and hands it to a handler.
//!
//! A job either completes together with its handler's settlement, fails with
//! its error recorded, or expires unexecuted. No single job stops the loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::adapter::outbound::sqlite::SqliteJobQueue;
use crate::domain::job::{ChatMessage, Event, Job, NewJob, Queue};
use crate::domain::settlement::Settlement;
use crate::error::{Error, Result};

/// Executes one event and returns the ledger writes to commit with it.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job, event: &Event) -> Result<Settlement>;
}

/// What happened to a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(i64),
    Failed(i64),
    Expired(i64),
}

pub struct Dispatcher {
    queue: Queue,
    jobs: SqliteJobQueue,
    handler: Arc<dyn JobHandler>,
    poll: Duration,
}

impl Dispatcher {
    pub fn new(
        queue: Queue,
        jobs: SqliteJobQueue,
        handler: Arc<dyn JobHandler>,
        poll: Duration,
    ) -> Self {
        Self {
            queue,
            jobs,
            handler,
            poll,
        }
    }

    /// Processes the oldest pending job, if any.
    ///
    /// # Errors
    /// Only store failures surface here; handler errors are recorded on the
    /// job instead.
    pub async fn run_once(&self) -> Result<Option<JobOutcome>> {
        let Some(job) = self.jobs.dequeue_oldest_pending(self.queue)? else {
            return Ok(None);
        };

        if job.is_expired_at(Utc::now()) {
            self.jobs.expire(job.id)?;
            info!(job_id = job.id, job_type = %job.job_type, "Job expired before execution");
            return Ok(Some(JobOutcome::Expired(job.id)));
        }

        let event = match Event::from_job(&job) {
            Ok(event) => event,
            Err(err) => {
                self.record_failure(&job, None, &err)?;
                return Ok(Some(JobOutcome::Failed(job.id)));
            }
        };

        self.jobs.ack(job.id)?;
        debug!(job_id = job.id, event = event.name(), "Job acked");

        let settled = match self.handler.handle(&job, &event).await {
            Ok(settlement) => self.jobs.complete(job.id, None, &settlement),
            Err(err) => Err(err),
        };

        match settled {
            Ok(()) => {
                info!(job_id = job.id, event = event.name(), "Job completed");
                Ok(Some(JobOutcome::Completed(job.id)))
            }
            Err(err) => {
                self.record_failure(&job, Some(&event), &err)?;
                Ok(Some(JobOutcome::Failed(job.id)))
            }
        }
    }

    /// Polls the queue until `shutdown` turns true or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(queue = %self.queue, poll_ms = self.poll.as_millis() as u64, "Dispatcher started");
        let mut ticker = tokio::time::interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        error!(queue = %self.queue, error = %err, "Dispatcher iteration failed");
                    }
                }
            }
        }

        info!(queue = %self.queue, "Dispatcher stopped");
    }

    fn record_failure(&self, job: &Job, event: Option<&Event>, err: &Error) -> Result<()> {
        error!(job_id = job.id, job_type = %job.job_type, error = %err, "Job failed");
        let data = execution_data(err);

        // Chat failures get no follow-up notification.
        let follow_up = match self.queue {
            Queue::Trade => vec![NewJob::chat(&ChatMessage::error(
                failure_message(job, event, err),
                job.id,
            ))?],
            Queue::Chat => Vec::new(),
        };

        if let Err(fail_err) = self.jobs.fail(job.id, &data, &follow_up) {
            if follow_up.is_empty() {
                return Err(fail_err);
            }
            warn!(job_id = job.id, error = %fail_err, "Failed to enqueue error notification");
            self.jobs.fail(job.id, &data, &[])?;
        }
        Ok(())
    }
}

/// Diagnostics stored on a failed job.
fn execution_data(err: &Error) -> serde_json::Value {
    match err {
        Error::Trade(trade) => json!({
            "exception": trade.message,
            "kind": trade.kind,
            "trade_information": trade.trade_information,
            "transaction_hashes": trade.transaction_hashes,
        }),
        other => json!({
            "exception": other.to_string(),
            "kind": "infrastructure",
        }),
    }
}

fn failure_message(job: &Job, event: Option<&Event>, err: &Error) -> String {
    match event {
        Some(Event::Buy(request) | Event::Sell(request)) => {
            format!("Trade error (swap pair {}): {err}", short_address(&request.pair.to_string()))
        }
        _ => format!("Error processing {} event {}: {err}", job.job_type, job.id),
    }
}

/// `0x1234...abcd`
fn short_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}
