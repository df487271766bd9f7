use tracing::info;

use super::{display_amount, EventHandlers};
use crate::application::trade::Submitted;
use crate::domain::job::{ChatMessage, Job, NewJob, WrapRequest};
use crate::domain::pair::NATIVE_TOKEN;
use crate::domain::settlement::Settlement;
use crate::error::{Result, TradeError, TransactionHashes};

impl EventHandlers {
    /// Deposits native ETH into WETH.
    pub(super) async fn wrap(&self, job: &Job, request: &WrapRequest) -> Result<Settlement> {
        let (Some(eth), Some(weth)) = (
            self.ledger.get_token(&NATIVE_TOKEN)?,
            self.ledger.get_token(&self.weth)?,
        ) else {
            return Err(TradeError::business("Missing token reference for ETH or WETH").into());
        };
        if eth.balance < request.value {
            return Err(TradeError::business(format!(
                "Not enough ETH to wrap, balance={}",
                eth.balance
            ))
            .into());
        }

        let tx_hash = match self.executor.wrap(request.value).await? {
            Submitted::Mined(receipt) if receipt.success => receipt.tx_hash.to_string(),
            Submitted::Mined(receipt) => {
                return Err(TradeError::execution("Wrap transaction reverted")
                    .with_hashes(TransactionHashes {
                        approve: None,
                        swap: Some(receipt.tx_hash.to_string()),
                    })
                    .into());
            }
            Submitted::TimedOut(hash) => {
                return Err(TradeError::timeout(format!("Wrap transaction {hash} timed out"))
                    .with_hashes(TransactionHashes {
                        approve: None,
                        swap: Some(hash),
                    })
                    .into());
            }
            Submitted::Unconfirmed { hash, reason } => {
                return Err(TradeError::execution(format!(
                    "Wrap transaction {hash} receipt unavailable: {reason}"
                ))
                .with_hashes(TransactionHashes {
                    approve: None,
                    swap: Some(hash),
                })
                .into());
            }
        };

        let eth_after = self.balance_of(&eth).await?;
        let weth_after = self.balance_of(&weth).await?;
        info!(%tx_hash, value = %request.value, "Wrapped ETH");

        let message = ChatMessage::embed(
            "Wrap transaction",
            format!(
                "Wrapped {} {} into {}",
                display_amount(request.value, eth.decimals),
                eth.symbol,
                weth.symbol
            ),
        )
        .with_url(self.chain_config.tx_link(&tx_hash))
        .with_field("Tx id", tx_hash)
        .with_field("Event Id", job.id.to_string());

        Ok(Settlement::default()
            .with_balance(eth.address, eth_after)
            .with_balance(weth.address, weth_after)
            .with_job(NewJob::chat(&message)?))
    }
}
