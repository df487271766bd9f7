//! SQLite persistence adapters.
//!
//! Provides the job queue, ledger, strategy state, settings and transaction
//! audit stores on top of Diesel ORM. All stores share one connection pool.

mod codec;
pub mod database;
pub mod job_queue;
pub mod ledger;
pub mod settings;
pub mod strategy_state;
pub mod transaction_log;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use job_queue::{SqliteJobQueue, WaitOutcome};
pub use ledger::SqliteLedger;
pub use settings::SqliteSettingsStore;
pub use strategy_state::SqliteStrategyStateStore;
pub use transaction_log::SqliteTransactionLog;
