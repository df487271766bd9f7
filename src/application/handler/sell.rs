use chrono::Utc;
use tracing::info;

use super::{
    display_amount, failed_trade, hashes, trade_information, with_information, EventHandlers,
};
use crate::domain::job::{Job, NewJob, TradeRequest};
use crate::domain::money::{apply_slippage, pow10};
use crate::domain::position::position_metric;
use crate::domain::settlement::{PositionChange, Settlement};
use crate::domain::trade::{TradeDirection, TradePayload};
use crate::error::{Result, TradeError};

impl EventHandlers {
    /// Swaps `request.value` base units back into the quote token, realizing
    /// the sold share of the position's profit.
    ///
    /// The position is closed once the wallet holds no base token.
    pub(super) async fn sell(&self, job: &Job, request: &TradeRequest) -> Result<Settlement> {
        let ctx = self.trade_context(request)?;
        let mut position = self.ledger.get_position(&ctx.pair.address)?.ok_or_else(|| {
            TradeError::business(format!("No open position for pair {}", ctx.pair.address))
        })?;

        let quote = self.fresh_quote(&ctx.pair, &ctx.quote).await?;

        let base_before = self.balance_of(&ctx.base).await?;
        let quote_before = self.balance_of(&ctx.quote).await?;

        if base_before < request.value {
            return Err(TradeError::business(format!(
                "Balance too low for {}, balance={base_before}",
                ctx.base.symbol
            ))
            .into());
        }
        self.ensure_gas_balance().await?;

        let expected =
            request.value.saturating_mul(quote.price) / pow10(u32::from(ctx.base.decimals));
        let min_amount_out = apply_slippage(expected, ctx.slippage)?;

        let payload = TradePayload {
            direction: TradeDirection::Sell,
            token_in: ctx.base.address,
            token_out: ctx.quote.address,
            symbol_in: ctx.base.symbol.clone(),
            symbol_out: ctx.quote.symbol.clone(),
            amount_in: request.value,
            min_amount_out,
        };
        let information = trade_information(
            job,
            ctx.handler,
            &payload,
            ctx.slippage,
            self.chain.chain_id(),
        );

        let result = self
            .executor
            .execute(ctx.handler, &ctx.pair, &payload)
            .await
            .map_err(|e| with_information(e, &information))?;
        if !result.is_success() {
            return Err(failed_trade("Sell order has failed!", &result, &information));
        }

        // Valued at the pre-trade holding so the realized share matches what was sold.
        let metric = position_metric(
            position.book_value,
            base_before,
            ctx.base.decimals,
            quote.price,
            ctx.quote.decimals,
        )?;

        let base_after = self.balance_of(&ctx.base).await?;
        let quote_after = self.balance_of(&ctx.quote).await?;
        let sold = base_before.saturating_sub(base_after);
        if sold.is_zero() {
            return Err(TradeError::execution("Trade has failed")
                .with_hashes(hashes(&result))
                .with_information(information)
                .into());
        }
        let received = quote_after.saturating_sub(quote_before);

        position.record_sell(sold, metric.pnl, ctx.quote.decimals, Utc::now())?;
        info!(
            pair = %ctx.pair.address,
            %sold,
            %received,
            realized_pnl = %position.realized_pnl,
            "Sell settled"
        );

        let change = if base_after.is_zero() {
            PositionChange::Close(position)
        } else {
            PositionChange::Upsert(position)
        };

        let message = self.swap_message(
            job,
            format!("Sell {} transaction", ctx.base.symbol),
            format!(
                "Sold {} {} for {} {}",
                display_amount(sold, ctx.base.decimals),
                ctx.base.symbol,
                display_amount(received, ctx.quote.decimals),
                ctx.quote.symbol
            ),
            &result,
        );

        Ok(Settlement::default()
            .with_balance(ctx.base.address, base_after)
            .with_balance(ctx.quote.address, quote_after)
            .with_position(change)
            .with_job(NewJob::chat(&message)?))
    }
}
