//! Outbound adapters (driven side).

pub mod coinbase;
pub mod dexscreener;
pub mod evm;
pub mod notifier;
pub mod sqlite;
