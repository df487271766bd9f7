//! SushiSwap v2 router swaps.

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use chrono::Utc;

use super::contracts::IUniswapV2Router;
use super::submit::Submitted;
use super::{TradeExecutor, ROUTER_DEADLINE_SECS};
use crate::domain::trade::TradePayload;
use crate::error::Result;

impl TradeExecutor {
    pub(super) async fn sushiswap_swap(&self, payload: &TradePayload) -> Result<Submitted> {
        let data = IUniswapV2Router::swapExactTokensForTokensCall {
            amountIn: payload.amount_in,
            amountOutMin: payload.min_amount_out,
            path: vec![payload.token_in, payload.token_out],
            to: self.chain.wallet(),
            deadline: U256::from(Utc::now().timestamp() + ROUTER_DEADLINE_SECS),
        }
        .abi_encode();

        let details = format!("{} swapped for {}", payload.symbol_in, payload.symbol_out);
        self.swap(self.contracts.sushiswap_router, data, details).await
    }
}
