use tracing::{debug, warn};

use super::EventHandlers;
use crate::domain::job::UpdateBalancesRequest;
use crate::domain::settlement::Settlement;
use crate::error::Result;

impl EventHandlers {
    /// Reads the wallet's on-chain balance of every requested token, or of
    /// every known token when the request lists none.
    pub(super) async fn update_balances(
        &self,
        request: &UpdateBalancesRequest,
    ) -> Result<Settlement> {
        let tokens = if request.addresses.is_empty() {
            self.ledger.list_tokens()?
        } else {
            let mut tokens = Vec::with_capacity(request.addresses.len());
            for address in &request.addresses {
                match self.ledger.get_token(address)? {
                    Some(token) => tokens.push(token),
                    None => warn!(token = %address, "Unknown token, balance not refreshed"),
                }
            }
            tokens
        };

        let mut settlement = Settlement::default();
        for token in &tokens {
            let balance = self.balance_of(token).await?;
            debug!(token = %token.symbol, %balance, "Balance read");
            settlement = settlement.with_balance(token.address, balance);
        }
        Ok(settlement)
    }
}
