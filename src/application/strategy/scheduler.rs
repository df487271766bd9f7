use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::{PairWorker, StrategyServices};
use crate::error::Result;

struct WorkerHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Keeps exactly one worker running per strategized pair.
pub struct StrategyScheduler {
    services: Arc<StrategyServices>,
    interval: Duration,
    worker_interval: Duration,
    workers: HashMap<Address, WorkerHandle>,
    /// Cancelled workers that have not finished yet. A pair listed here gets
    /// no new worker.
    stopping: HashMap<Address, JoinHandle<()>>,
}

impl StrategyScheduler {
    pub fn new(
        services: Arc<StrategyServices>,
        interval: Duration,
        worker_interval: Duration,
    ) -> Self {
        Self {
            services,
            interval,
            worker_interval,
            workers: HashMap::new(),
            stopping: HashMap::new(),
        }
    }

    /// Number of live workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn has_worker(&self, pair: &Address) -> bool {
        self.workers.contains_key(pair)
    }

    /// Whether a cancelled worker for `pair` is still finishing.
    #[must_use]
    pub fn is_stopping(&self, pair: &Address) -> bool {
        self.stopping.contains_key(pair)
    }

    /// Reaps finished workers, cancels those whose pair lost its strategy,
    /// and starts workers for newly strategized pairs.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run_once(&mut self) -> Result<()> {
        self.workers.retain(|pair, handle| {
            let finished = handle.task.is_finished();
            if finished {
                info!(%pair, "Strategy worker reaped");
            }
            !finished
        });
        self.stopping.retain(|_, task| !task.is_finished());

        let tracked: HashSet<Address> = self
            .services
            .ledger
            .list_strategized_pairs()?
            .into_iter()
            .map(|pair| pair.address)
            .collect();

        let untracked: Vec<Address> = self
            .workers
            .keys()
            .filter(|pair| !tracked.contains(*pair))
            .copied()
            .collect();
        for pair in untracked {
            if let Some(handle) = self.workers.remove(&pair) {
                info!(%pair, "Pair untracked, cancelling worker");
                let _ = handle.cancel.send(true);
                self.stopping.insert(pair, handle.task);
            }
        }

        for pair in tracked {
            if self.workers.contains_key(&pair) {
                continue;
            }
            if self.stopping.contains_key(&pair) {
                debug!(%pair, "Previous worker still stopping, deferring spawn");
                continue;
            }
            let (cancel, rx) = watch::channel(false);
            let worker = PairWorker::new(pair, self.services.clone(), self.worker_interval);
            let task = tokio::spawn(worker.run(rx));
            info!(%pair, "Strategy worker spawned");
            self.workers.insert(pair, WorkerHandle { cancel, task });
        }
        Ok(())
    }

    /// Schedules until `shutdown`, then cancels every worker and waits for
    /// them to stop.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Strategy scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once() {
                        error!(error = %err, "Scheduler iteration failed");
                    }
                }
            }
        }

        self.shutdown().await;
        info!("Strategy scheduler stopped");
    }

    /// Cancels and joins every worker, including those already stopping.
    pub async fn shutdown(&mut self) {
        for handle in self.workers.values() {
            let _ = handle.cancel.send(true);
        }
        for (pair, handle) in self.workers.drain() {
            if let Err(err) = handle.task.await {
                error!(%pair, error = %err, "Strategy worker panicked");
            }
        }
        for (pair, task) in self.stopping.drain() {
            if let Err(err) = task.await {
                error!(%pair, error = %err, "Strategy worker panicked");
            }
        }
    }
}
