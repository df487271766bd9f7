//! SQLite-backed persistent job queue.
//!
//! Status changes are conditional updates on the job's current status, so an
//! illegal transition is rejected by the store itself rather than trusted to
//! callers.

use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::codec::{parse_json, parse_opt_ts, parse_ts, ts};
use super::database::connection::DbPool;
use super::database::model::{JobRow, NewJobRow};
use super::database::schema::jobs;
use super::ledger::apply_ledger_changes;
use crate::domain::job::{Job, JobStatus, NewJob, Queue};
use crate::domain::settlement::Settlement;
use crate::error::{Error, Result};

/// Poll interval of [`SqliteJobQueue::wait_for_resolution`].
const RESOLUTION_POLL: Duration = Duration::from_millis(100);

/// How a bounded wait on a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The job reached a terminal status.
    Resolved(JobStatus),
    /// The job was still pending at the deadline and has been expired, so it
    /// can never run late.
    TimedOut,
    /// The caller's cancellation signal fired.
    Cancelled,
}

#[derive(Clone)]
pub struct SqliteJobQueue {
    pool: DbPool,
}

impl SqliteJobQueue {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist a new pending job and return its id.
    pub fn enqueue(&self, job: &NewJob) -> Result<i64> {
        let mut conn = self.pool.get()?;
        insert_job(&mut conn, job, Utc::now())
    }

    pub fn get(&self, id: i64) -> Result<Option<Job>> {
        let mut conn = self.pool.get()?;
        find_job(&mut conn, id)?.map(job_from_row).transpose()
    }

    /// The oldest pending job of `queue`, by creation time then id.
    pub fn dequeue_oldest_pending(&self, queue: Queue) -> Result<Option<Job>> {
        let mut conn = self.pool.get()?;
        jobs::table
            .filter(jobs::queue.eq(queue.as_str()))
            .filter(jobs::status.eq(JobStatus::Pending.as_str()))
            .order((jobs::created_at.asc(), jobs::id.asc()))
            .select(JobRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(job_from_row)
            .transpose()
    }

    /// All jobs of a queue in creation order.
    pub fn list(&self, queue: Queue) -> Result<Vec<Job>> {
        let mut conn = self.pool.get()?;
        jobs::table
            .filter(jobs::queue.eq(queue.as_str()))
            .order((jobs::created_at.asc(), jobs::id.asc()))
            .select(JobRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(job_from_row)
            .collect()
    }

    /// `Pending -> Acked`.
    pub fn ack(&self, id: i64) -> Result<()> {
        let now = ts(Utc::now());
        let mut conn = self.pool.get()?;
        let target = jobs::table
            .filter(jobs::id.eq(id))
            .filter(jobs::status.eq_any(predecessors(JobStatus::Acked)));
        let updated = diesel::update(target)
            .set((
                jobs::status.eq(JobStatus::Acked.as_str()),
                jobs::acked_at.eq(&now),
            ))
            .execute(&mut conn)?;
        ensure_transition(&mut conn, id, JobStatus::Acked, updated)
    }

    /// `Acked -> Completed`, committing `settlement` in the same transaction.
    pub fn complete(
        &self,
        id: i64,
        execution_data: Option<&serde_json::Value>,
        settlement: &Settlement,
    ) -> Result<()> {
        let now = Utc::now();
        let data = execution_data.map(serde_json::to_string).transpose()?;
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            let target = jobs::table
                .filter(jobs::id.eq(id))
                .filter(jobs::status.eq_any(predecessors(JobStatus::Completed)));
            let updated = diesel::update(target)
                .set((
                    jobs::status.eq(JobStatus::Completed.as_str()),
                    jobs::completed_at.eq(ts(now)),
                    jobs::execution_data.eq(&data),
                ))
                .execute(conn)?;
            ensure_transition(conn, id, JobStatus::Completed, updated)?;

            apply_ledger_changes(conn, settlement, now)?;
            for job in &settlement.jobs {
                insert_job(conn, job, now)?;
            }
            Ok(())
        })
    }

    /// `{Pending, Acked} -> Failed`, enqueueing `follow_up` atomically.
    pub fn fail(
        &self,
        id: i64,
        execution_data: &serde_json::Value,
        follow_up: &[NewJob],
    ) -> Result<()> {
        let now = Utc::now();
        let data = serde_json::to_string(execution_data)?;
        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            let target = jobs::table
                .filter(jobs::id.eq(id))
                .filter(jobs::status.eq_any(predecessors(JobStatus::Failed)));
            let updated = diesel::update(target)
                .set((
                    jobs::status.eq(JobStatus::Failed.as_str()),
                    jobs::completed_at.eq(ts(now)),
                    jobs::execution_data.eq(&data),
                ))
                .execute(conn)?;
            ensure_transition(conn, id, JobStatus::Failed, updated)?;

            for job in follow_up {
                insert_job(conn, job, now)?;
            }
            Ok(())
        })
    }

    /// `Pending -> Expired`.
    pub fn expire(&self, id: i64) -> Result<()> {
        let mut conn = self.pool.get()?;
        let updated = expire_pending(&mut conn, id)?;
        ensure_transition(&mut conn, id, JobStatus::Expired, updated)
    }

    /// Expire the job if it is still pending. Returns whether it was.
    pub fn expire_if_pending(&self, id: i64) -> Result<bool> {
        let mut conn = self.pool.get()?;
        Ok(expire_pending(&mut conn, id)? > 0)
    }

    /// Poll until the job reaches a terminal status or `cancel` turns true.
    ///
    /// `timeout` bounds only the time the job may spend pending. At the
    /// deadline a still-pending job is expired and the wait ends with
    /// [`WaitOutcome::TimedOut`]. A job a dispatcher already picked up is
    /// followed until it resolves.
    pub async fn wait_for_resolution(
        &self,
        id: i64,
        timeout: Duration,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<WaitOutcome> {
        let mut deadline = Some(tokio::time::Instant::now() + timeout);
        loop {
            let job = self
                .get(id)?
                .ok_or_else(|| Error::Database(format!("job {id} not found")))?;
            if job.status.is_terminal() {
                return Ok(WaitOutcome::Resolved(job.status));
            }
            if *cancel.borrow() {
                return Ok(WaitOutcome::Cancelled);
            }
            if deadline.is_some_and(|at| tokio::time::Instant::now() >= at) {
                if self.expire_if_pending(id)? {
                    warn!(job_id = id, "Job still pending at deadline, expired");
                    return Ok(WaitOutcome::TimedOut);
                }
                debug!(job_id = id, "Job in flight at deadline, waiting for it to resolve");
                deadline = None;
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(RESOLUTION_POLL) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        return Ok(WaitOutcome::Cancelled);
                    }
                }
            }
        }
    }
}

/// Stored status strings a job may hold immediately before moving to `to`.
fn predecessors(to: JobStatus) -> Vec<&'static str> {
    to.allowed_predecessors()
        .iter()
        .map(|s| s.as_str())
        .collect()
}

fn expire_pending(conn: &mut SqliteConnection, id: i64) -> Result<usize> {
    let target = jobs::table
        .filter(jobs::id.eq(id))
        .filter(jobs::status.eq_any(predecessors(JobStatus::Expired)));
    Ok(diesel::update(target)
        .set((
            jobs::status.eq(JobStatus::Expired.as_str()),
            jobs::completed_at.eq(ts(Utc::now())),
        ))
        .execute(conn)?)
}

fn ensure_transition(
    conn: &mut SqliteConnection,
    id: i64,
    to: JobStatus,
    updated: usize,
) -> Result<()> {
    if updated > 0 {
        debug!(job_id = id, status = %to, "Job transitioned");
        return Ok(());
    }
    let from = find_job(conn, id)?.map_or_else(|| "missing".to_string(), |row| row.status);
    Err(Error::InvalidTransition {
        id,
        from,
        to: to.as_str(),
    })
}

fn find_job(conn: &mut SqliteConnection, id: i64) -> Result<Option<JobRow>> {
    Ok(jobs::table
        .find(id)
        .select(JobRow::as_select())
        .first(conn)
        .optional()?)
}

fn insert_job(
    conn: &mut SqliteConnection,
    job: &NewJob,
    now: DateTime<Utc>,
) -> Result<i64> {
    let row = NewJobRow {
        queue: job.queue.as_str().to_string(),
        job_type: job.job_type.clone(),
        payload: serde_json::to_string(&job.payload)?,
        status: JobStatus::Pending.as_str().to_string(),
        created_at: ts(now),
        expire_at: job.expire_at.map(ts),
    };
    diesel::insert_into(jobs::table)
        .values(&row)
        .execute(conn)?;
    let id = diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)?
        .id;
    Ok(id)
}

#[derive(QueryableByName)]
struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
}

fn job_from_row(row: JobRow) -> Result<Job> {
    Ok(Job {
        id: row.id,
        queue: row.queue.parse::<Queue>()?,
        job_type: row.job_type,
        payload: parse_json(&row.payload)?,
        status: row.status.parse::<JobStatus>()?,
        created_at: parse_ts(&row.created_at)?,
        acked_at: parse_opt_ts(row.acked_at.as_deref())?,
        completed_at: parse_opt_ts(row.completed_at.as_deref())?,
        expire_at: parse_opt_ts(row.expire_at.as_deref())?,
        execution_data: row.execution_data.as_deref().map(parse_json).transpose()?,
    })
}
