//! Application shell: configuration and runtime wiring.

pub mod config;
mod orchestrator;

pub use orchestrator::App;
