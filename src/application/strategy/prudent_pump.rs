//! Rides a pump and sells on a pullback from the peak, at a take-profit
//! ceiling, or at the stop loss.
//!
//! The operator is told why a sell starts and about every retry. A sell is
//! retried with widening slippage. After the last attempt fails the pair's
//! strategy is cleared and the operator is told. Either way the state ends
//! disabled.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tracing::{info, warn};

use super::{SellOutcome, StrategyContext, StrategyServices};
use crate::domain::job::{ChatMessage, NewJob};
use crate::domain::setting::SettingName;
use crate::domain::strategy::PrudentPumpState;
use crate::error::Result;

/// The trailing stop arms once the peak PnL% exceeds this.
const PEAK_ARM_PERCENT: Decimal = dec!(15);
/// Allowed pullback from the peak, as a fraction of it.
const PULLBACK: Decimal = dec!(0.10);
const TAKE_PROFIT_PERCENT: Decimal = dec!(50);
const MAX_ATTEMPTS: u32 = 3;
/// Slippage grows by this fraction of the base value per failed attempt.
const SLIPPAGE_STEP: Decimal = dec!(0.5);
const FALLBACK_SLIPPAGE: Decimal = dec!(0.1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SellReason {
    Pullback,
    TakeProfit,
    StopLoss,
}

impl SellReason {
    fn notice(self, symbol: &str) -> String {
        match self {
            Self::Pullback => format!("Profit falling back from its peak for {symbol}, selling"),
            Self::TakeProfit => format!("Profit target met for {symbol}, selling"),
            Self::StopLoss => format!("Stop loss hit for {symbol}, selling"),
        }
    }
}

fn sell_reason(pnl_percent: Decimal, peak: Decimal, stop_loss: Decimal) -> Option<SellReason> {
    if peak > PEAK_ARM_PERCENT && pnl_percent < peak * (Decimal::ONE - PULLBACK) {
        Some(SellReason::Pullback)
    } else if pnl_percent >= TAKE_PROFIT_PERCENT {
        Some(SellReason::TakeProfit)
    } else if pnl_percent <= stop_loss {
        Some(SellReason::StopLoss)
    } else {
        None
    }
}

fn attempt_slippage(base: Decimal, retry_count: u32) -> Decimal {
    let widened = base * (Decimal::ONE + SLIPPAGE_STEP * Decimal::from(retry_count));
    widened.min(Decimal::ONE)
}

pub(super) async fn evaluate(
    services: &StrategyServices,
    ctx: &StrategyContext,
    mut state: PrudentPumpState,
    cancel: &mut watch::Receiver<bool>,
) -> Result<PrudentPumpState> {
    if state.disabled {
        return Ok(state);
    }
    let Some(metric) = ctx.metric()? else {
        return Ok(state);
    };

    let pnl = metric.pnl_percent;
    if pnl > state.highest_profit {
        state.highest_profit = pnl;
    }
    let stop_loss = services.settings.get(SettingName::StopLoss)?;
    let Some(reason) = sell_reason(pnl, state.highest_profit, stop_loss) else {
        return Ok(state);
    };
    info!(
        pair = %ctx.pair.address,
        ?reason,
        pnl_percent = %pnl.round_dp(4),
        peak = %state.highest_profit.round_dp(4),
        "Prudent pump selling"
    );
    notify(services, reason.notice(&ctx.base_token.symbol))?;

    let base_slippage = match services.settings.get(SettingName::Slippage)? {
        s if s.is_zero() => FALLBACK_SLIPPAGE,
        s => s,
    };

    while state.retry_count < MAX_ATTEMPTS {
        let slippage = attempt_slippage(base_slippage, state.retry_count);
        if state.retry_count > 0 {
            notify(
                services,
                format!(
                    "Sell retry {}/{MAX_ATTEMPTS} for {}",
                    state.retry_count + 1,
                    ctx.base_token.symbol
                ),
            )?;
        }
        match services
            .request_sell(&ctx.pair, ctx.base_token.balance, Some(slippage), cancel)
            .await?
        {
            SellOutcome::Completed => {
                info!(pair = %ctx.pair.address, "Prudent pump sold, disabling");
                return Ok(PrudentPumpState {
                    disabled: true,
                    ..PrudentPumpState::default()
                });
            }
            SellOutcome::Cancelled => return Ok(state),
            SellOutcome::Failed | SellOutcome::TimedOut => {
                state.retry_count += 1;
                warn!(
                    pair = %ctx.pair.address,
                    attempt = state.retry_count,
                    %slippage,
                    "Prudent pump sell attempt failed"
                );
            }
        }
    }

    services.ledger.set_pair_strategy(&ctx.pair.address, None)?;
    state.disabled = true;
    warn!(pair = %ctx.pair.address, "Prudent pump gave up, strategy cleared");
    notify(
        services,
        format!(
            "Prudent pump could not sell {} on pair {} after {MAX_ATTEMPTS} attempts, strategy disabled",
            ctx.base_token.symbol, ctx.pair.address
        ),
    )?;
    Ok(state)
}

fn notify(services: &StrategyServices, message: String) -> Result<()> {
    services
        .jobs
        .enqueue(&NewJob::chat(&ChatMessage::text(message))?)?;
    Ok(())
}
