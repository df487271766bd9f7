use chrono::Utc;
use tracing::info;

use super::{
    display_amount, failed_trade, hashes, trade_information, with_information, EventHandlers,
};
use crate::domain::job::{Job, NewJob, TradeRequest};
use crate::domain::money::{apply_slippage, pow10, to_units};
use crate::domain::position::Position;
use crate::domain::setting::SettingName;
use crate::domain::settlement::{PositionChange, Settlement};
use crate::domain::trade::{TradeDirection, TradePayload};
use crate::error::{Result, TradeError};

impl EventHandlers {
    /// Swaps `request.value` quote units for the pair's base token and adds
    /// the purchase to the position.
    pub(super) async fn buy(&self, job: &Job, request: &TradeRequest) -> Result<Settlement> {
        let ctx = self.trade_context(request)?;
        let mut position = self
            .ledger
            .get_position(&ctx.pair.address)?
            .unwrap_or_else(|| Position::open(ctx.pair.address, Utc::now()));

        let quote = self.fresh_quote(&ctx.pair, &ctx.quote).await?;

        let base_before = self.balance_of(&ctx.base).await?;
        let quote_before = self.balance_of(&ctx.quote).await?;

        if quote_before < request.value {
            return Err(TradeError::business(format!(
                "Balance too low for {}, balance={quote_before}",
                ctx.quote.symbol
            ))
            .into());
        }
        let min_quote = to_units(
            self.settings.get(SettingName::MinWethRequired)?,
            u32::from(ctx.quote.decimals),
        )?;
        if quote_before < min_quote {
            return Err(TradeError::business("Balance of WETH under minimum requirement").into());
        }
        self.ensure_gas_balance().await?;

        let expected = request
            .value
            .saturating_mul(pow10(u32::from(ctx.base.decimals)))
            / quote.price;
        let min_amount_out = apply_slippage(expected, ctx.slippage)?;

        let payload = TradePayload {
            direction: TradeDirection::Buy,
            token_in: ctx.quote.address,
            token_out: ctx.base.address,
            symbol_in: ctx.quote.symbol.clone(),
            symbol_out: ctx.base.symbol.clone(),
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
            return Err(failed_trade("Buy order has failed!", &result, &information));
        }

        let base_after = self.balance_of(&ctx.base).await?;
        let quote_after = self.balance_of(&ctx.quote).await?;
        let bought = base_after.saturating_sub(base_before);
        if bought.is_zero() {
            return Err(TradeError::execution("Trade has failed")
                .with_hashes(hashes(&result))
                .with_information(information)
                .into());
        }
        let spent = match quote_before.saturating_sub(quote_after) {
            spent if spent.is_zero() => request.value,
            spent => spent,
        };

        position.record_buy(spent, bought, Utc::now());
        info!(
            pair = %ctx.pair.address,
            %bought,
            %spent,
            book_value = %position.book_value,
            "Buy settled"
        );

        let message = self.swap_message(
            job,
            format!("Buy {} transaction", ctx.base.symbol),
            format!(
                "Bought {} {}",
                display_amount(bought, ctx.base.decimals),
                ctx.base.symbol
            ),
            &result,
        );

        Ok(Settlement::default()
            .with_balance(ctx.base.address, base_after)
            .with_balance(ctx.quote.address, quote_after)
            .with_position(PositionChange::Upsert(position))
            .with_job(NewJob::chat(&message)?))
    }
}
