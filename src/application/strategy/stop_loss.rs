use tokio::sync::watch;
use tracing::info;

use super::{SellOutcome, StrategyContext, StrategyServices};
use crate::domain::setting::SettingName;
use crate::domain::strategy::StopLossState;
use crate::error::Result;

/// Sells the whole holding once PnL falls to the `STOP_LOSS` setting.
pub(super) async fn evaluate(
    services: &StrategyServices,
    ctx: &StrategyContext,
    state: &StopLossState,
    cancel: &mut watch::Receiver<bool>,
) -> Result<StopLossState> {
    let Some(metric) = ctx.metric()? else {
        return Ok(state.clone());
    };
    let stop_loss = services.settings.get(SettingName::StopLoss)?;
    if metric.pnl_percent > stop_loss {
        return Ok(state.clone());
    }

    info!(
        pair = %ctx.pair.address,
        pnl_percent = %metric.pnl_percent.round_dp(4),
        %stop_loss,
        "Stop loss triggered"
    );
    let outcome = services
        .request_sell(&ctx.pair, ctx.base_token.balance, None, cancel)
        .await?;
    if outcome == SellOutcome::Completed {
        info!(pair = %ctx.pair.address, "Stop loss sell completed");
    }
    Ok(state.clone())
}
