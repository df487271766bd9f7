//! Alloy-backed blockchain client.
//!
//! Signs with a local private key and talks to a single HTTP RPC endpoint.
//! Receipt waits are bounded by the configured timeout.

use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::network::{EthereumWallet, TransactionBuilder};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::sol;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::gas::GasOracle;
use crate::error::{ChainError, ConfigError, Result};
use crate::port::outbound::chain::{ChainClient, GasFees, TxReceipt, TxRequest};

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

pub struct AlloyChainClient {
    provider: DynProvider,
    signer: PrivateKeySigner,
    chain_id: u64,
    receipt_timeout: Duration,
    gas: GasOracle,
}

impl AlloyChainClient {
    /// Connect to `rpc_url` with the wallet derived from `private_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key or RPC URL is invalid.
    pub fn new(
        rpc_url: &str,
        private_key: &str,
        chain_id: u64,
        receipt_timeout: Duration,
    ) -> Result<Self> {
        if private_key.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "WALLET_PRIVATE_KEY",
            }
            .into());
        }

        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| ConfigError::InvalidValue {
                field: "WALLET_PRIVATE_KEY",
                reason: e.to_string(),
            })?
            .with_chain_id(Some(chain_id));

        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ConfigError::InvalidValue {
                field: "rpc_url",
                reason: e.to_string(),
            })?;

        let wallet = EthereumWallet::from(signer.clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(url)
            .erased();

        info!(wallet = %signer.address(), chain_id, "Chain client ready");

        Ok(Self {
            gas: GasOracle::new(provider.clone()),
            provider,
            signer,
            chain_id,
            receipt_timeout,
        })
    }

    fn request(&self, tx: &TxRequest) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(tx.to)
            .with_input(tx.data.clone())
            .with_value(tx.value)
            .with_chain_id(self.chain_id);
        if let Some(gas) = tx.gas_limit {
            request = request.with_gas_limit(gas);
        }
        if let Some(max_fee) = tx.max_fee_per_gas {
            request = request.with_max_fee_per_gas(max_fee);
        }
        if let Some(tip) = tx.max_priority_fee_per_gas {
            request = request.with_max_priority_fee_per_gas(tip);
        }
        request
    }
}

fn rpc_error(e: impl std::fmt::Display) -> ChainError {
    ChainError::Rpc(e.to_string())
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    fn wallet(&self) -> Address {
        self.signer.address()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        Ok(self.provider.get_balance(owner).await.map_err(rpc_error)?)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.balanceOf(owner).call().await.map_err(rpc_error)?)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        Ok(self.provider.call(request).await.map_err(rpc_error)?)
    }

    async fn estimate_fees(&self) -> Result<GasFees> {
        self.gas.estimate().await
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        Ok(self
            .provider
            .estimate_gas(self.request(tx))
            .await
            .map_err(rpc_error)?)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxReceipt> {
        let pending = self
            .provider
            .send_transaction(self.request(&tx))
            .await
            .map_err(rpc_error)?;
        let tx_hash = *pending.tx_hash();
        debug!(tx_hash = %tx_hash, to = %tx.to, "Transaction broadcast");

        match tokio::time::timeout(self.receipt_timeout, pending.get_receipt()).await {
            Err(_) => {
                warn!(tx_hash = %tx_hash, "Receipt wait timed out");
                Err(ChainError::Timeout {
                    tx_hash: tx_hash.to_string(),
                }
                .into())
            }
            Ok(Err(e)) => {
                warn!(tx_hash = %tx_hash, error = %e, "Receipt fetch failed");
                Err(ChainError::Receipt {
                    tx_hash: tx_hash.to_string(),
                    reason: e.to_string(),
                }
                .into())
            }
            Ok(Ok(receipt)) => {
                info!(
                    tx_hash = %receipt.transaction_hash,
                    block = ?receipt.block_number,
                    success = receipt.status(),
                    "Transaction mined"
                );
                Ok(TxReceipt {
                    tx_hash: receipt.transaction_hash,
                    block_number: receipt.block_number,
                    success: receipt.status(),
                })
            }
        }
    }

    fn sign_hash(&self, hash: B256) -> Result<Bytes> {
        let signature = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}
