//! dexbot - an event-driven DEX pair trading engine.
//!
//! Trade actions and operator notifications flow through a persisted job
//! queue. One dispatcher per queue executes jobs serially; per-pair strategy
//! workers decide when to sell and enqueue the trades themselves.
//!
//! # Modules
//!
//! - [`domain`] - Jobs, pairs, positions, strategies and fixed-point money math
//! - [`port`] - Chain, market data and notifier interfaces
//! - [`adapter`] - SQLite stores, the alloy chain client, DexScreener, notifiers
//! - [`application`] - Dispatcher, event handlers, trade executors, strategies
//! - [`app`] - Configuration and runtime wiring
//! - [`error`] - Error types for the crate

pub mod adapter;
pub mod app;
pub mod application;
pub mod domain;
pub mod error;
pub mod port;
