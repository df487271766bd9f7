//! Ledger writes produced by a successful event handler.
//!
//! A settlement is committed in the same database transaction that marks
//! its job completed, so balances, positions and notifications never
//! diverge from the job's recorded outcome.

use alloy_primitives::{Address, U256};

use super::job::NewJob;
use super::position::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionChange {
    /// Insert or replace the open position.
    Upsert(Position),
    /// Archive the final snapshot and delete the open position.
    Close(Position),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settlement {
    /// Observed token balances, keyed by token address.
    pub balances: Vec<(Address, U256)>,
    pub position: Option<PositionChange>,
    /// Follow-up jobs, typically chat notifications.
    pub jobs: Vec<NewJob>,
}

impl Settlement {
    #[must_use]
    pub fn with_balance(mut self, token: Address, balance: U256) -> Self {
        self.balances.push((token, balance));
        self
    }

    #[must_use]
    pub fn with_position(mut self, change: PositionChange) -> Self {
        self.position = Some(change);
        self
    }

    #[must_use]
    pub fn with_job(mut self, job: NewJob) -> Self {
        self.jobs.push(job);
        self
    }
}
