//! Chain connection and contract address configuration.

use std::time::Duration;

use alloy_primitives::{address, Address};
use serde::Deserialize;

/// RPC endpoint and network identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Pairs on any other chain are rejected by the trade handlers.
    #[serde(default = "default_chain_name")]
    pub name: String,
    /// Block explorer used for transaction links in notifications.
    #[serde(default = "default_explorer_url")]
    pub explorer_url: String,
    /// Upper bound on waiting for a transaction receipt.
    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,
    /// Loaded from `WALLET_PRIVATE_KEY` at runtime, never from the file.
    #[serde(skip)]
    pub private_key: Option<String>,
}

fn default_chain_id() -> u64 {
    8453 // Base mainnet
}

fn default_chain_name() -> String {
    "base".into()
}

fn default_explorer_url() -> String {
    "https://basescan.org".into()
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

impl ChainConfig {
    /// Explorer link for a transaction hash.
    #[must_use]
    pub fn tx_link(&self, tx_hash: &str) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url.trim_end_matches('/'))
    }

    #[must_use]
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: default_chain_id(),
            name: default_chain_name(),
            explorer_url: default_explorer_url(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            private_key: None,
        }
    }
}

/// Router and token contracts. Defaults are the Base mainnet deployments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub weth: Address,
    pub permit2: Address,
    pub universal_router: Address,
    pub sushiswap_router: Address,
    pub aerodrome_router: Address,
    pub aerodrome_factory: Address,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            weth: address!("4200000000000000000000000000000000000006"),
            permit2: address!("000000000022D473030F116dDEE9F6B43aC78BA3"),
            universal_router: address!("3fC91A3afd70395Cd496C647d5a6CC9D4B2b7FAD"),
            sushiswap_router: address!("6BDED42c6DA8FBf0d2bA55B2fa120C5e0c8D7891"),
            aerodrome_router: address!("cF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43"),
            aerodrome_factory: address!("420DD381b31aEf6683db6B902084cB0FFECe40Da"),
        }
    }
}
