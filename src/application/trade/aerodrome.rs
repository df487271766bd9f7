//! Aerodrome router swaps over a single volatile pool.

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use chrono::Utc;

use super::contracts::IAerodromeRouter;
use super::submit::Submitted;
use super::{TradeExecutor, ROUTER_DEADLINE_SECS};
use crate::domain::trade::TradePayload;
use crate::error::Result;

impl TradeExecutor {
    pub(super) async fn aerodrome_swap(&self, payload: &TradePayload) -> Result<Submitted> {
        let route = IAerodromeRouter::Route {
            from: payload.token_in,
            to: payload.token_out,
            stable: false,
            factory: self.contracts.aerodrome_factory,
        };
        let data = IAerodromeRouter::swapExactTokensForTokensCall {
            amountIn: payload.amount_in,
            amountOutMin: payload.min_amount_out,
            routes: vec![route],
            to: self.chain.wallet(),
            deadline: U256::from(Utc::now().timestamp() + ROUTER_DEADLINE_SECS),
        }
        .abi_encode();

        let details = format!("{} swapped for {}", payload.symbol_in, payload.symbol_out);
        self.swap(self.contracts.aerodrome_router, data, details).await
    }
}
