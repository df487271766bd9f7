//! EVM chain adapter built on alloy.

pub mod client;
pub mod gas;

pub use client::AlloyChainClient;
pub use gas::GasOracle;
