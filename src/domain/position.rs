//! Open positions and the PnL calculator.

use alloy_primitives::{Address, I256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::money::{pow10, to_decimal, to_signed_units};

/// Fixed-point scale of the sold fraction.
const RATIO_SCALE: u32 = 18;

/// The bot's holding and cost basis for one pair's base token.
///
/// Amounts are smallest units: `token_bought`/`token_sold` of the base token,
/// `book_value`/`realized_pnl` of the quote token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub pair_address: Address,
    pub token_bought: U256,
    pub token_sold: U256,
    pub book_value: U256,
    pub realized_pnl: I256,
    pub created_at: DateTime<Utc>,
    pub last_action_at: DateTime<Utc>,
}

impl Position {
    /// An empty position opened at `now`.
    #[must_use]
    pub fn open(pair_address: Address, now: DateTime<Utc>) -> Self {
        Self {
            pair_address,
            token_bought: U256::ZERO,
            token_sold: U256::ZERO,
            book_value: U256::ZERO,
            realized_pnl: I256::ZERO,
            created_at: now,
            last_action_at: now,
        }
    }

    /// Adds a buy: `spent` quote units for `bought` base units.
    pub fn record_buy(&mut self, spent: U256, bought: U256, now: DateTime<Utc>) {
        self.book_value = self.book_value.saturating_add(spent);
        self.token_bought = self.token_bought.saturating_add(bought);
        self.last_action_at = now;
    }

    /// Removes the sold fraction of the cost basis and realizes that fraction
    /// of `pnl` (whole quote tokens).
    ///
    /// The fraction is `sold / token_bought`, capped at 1. Nothing is
    /// realized on a position with nothing bought.
    ///
    /// # Errors
    /// Returns [`DomainError::AmountOverflow`] if an intermediate value does
    /// not fit.
    pub fn record_sell(
        &mut self,
        sold: U256,
        pnl: Decimal,
        quote_decimals: u8,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.token_bought.is_zero() {
            let counted = sold.min(self.token_bought);
            let overflow = || DomainError::AmountOverflow {
                amount: counted.to_string(),
            };

            let released = self
                .book_value
                .checked_mul(counted)
                .ok_or_else(overflow)?
                / self.token_bought;
            let ratio_units = counted
                .checked_mul(pow10(RATIO_SCALE))
                .ok_or_else(overflow)?
                / self.token_bought;
            let ratio = to_decimal(ratio_units, RATIO_SCALE)?;
            let realized = ratio
                .checked_mul(pnl)
                .ok_or_else(|| DomainError::AmountOverflow {
                    amount: pnl.to_string(),
                })?;

            self.book_value -= released;
            self.realized_pnl = self
                .realized_pnl
                .saturating_add(to_signed_units(realized, u32::from(quote_decimals))?);
        }
        self.token_sold = self.token_sold.saturating_add(sold);
        self.last_action_at = now;
        Ok(())
    }
}

/// Profit metrics of a position at a given price, in whole quote tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionMetric {
    pub market_value: Decimal,
    pub price_paid: Decimal,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
}

/// Computes market value, cost basis and profit for a holding.
///
/// Only whole base tokens are valued: the balance is divided by
/// `10^base_decimals` with truncation before applying `price`. `pnl_percent`
/// is zero when nothing was paid.
///
/// # Errors
/// Returns [`DomainError::AmountOverflow`] if an intermediate value does not
/// fit a [`Decimal`].
pub fn position_metric(
    book_value: U256,
    base_balance: U256,
    base_decimals: u8,
    price: U256,
    quote_decimals: u8,
) -> Result<PositionMetric, DomainError> {
    let whole_base = base_balance / pow10(u32::from(base_decimals));
    let value_units = whole_base
        .checked_mul(price)
        .ok_or_else(|| DomainError::AmountOverflow {
            amount: whole_base.to_string(),
        })?;

    let market_value = to_decimal(value_units, u32::from(quote_decimals))?;
    let price_paid = to_decimal(book_value, u32::from(quote_decimals))?;
    let pnl = market_value - price_paid;
    let pnl_percent = if price_paid.is_zero() {
        Decimal::ZERO
    } else {
        pnl.checked_div(price_paid)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| DomainError::AmountOverflow {
                amount: pnl.to_string(),
            })?
    };

    Ok(PositionMetric {
        market_value,
        price_paid,
        pnl,
        pnl_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn u(s: &str) -> U256 {
        s.parse().unwrap()
    }

    #[test]
    fn metric_in_profit() {
        let metric = position_metric(
            u("2000000000000000"),
            u("203275914293585192130411757"),
            18,
            u("11212000"),
            18,
        )
        .unwrap();

        assert_eq!(metric.market_value, dec!(0.002279129547768));
        assert_eq!(metric.price_paid, dec!(0.002));
        assert_eq!(metric.pnl, dec!(0.000279129547768));
        assert_eq!(metric.pnl_percent.round_dp(4), dec!(13.9565));
    }

    #[test]
    fn metric_in_loss() {
        let metric = position_metric(
            u("2000000000000000"),
            u("203275914293585192130411757"),
            18,
            u("9212000"),
            18,
        )
        .unwrap();

        assert_eq!(metric.pnl, dec!(-0.000127422280232));
        assert_eq!(metric.pnl_percent.round_dp(4), dec!(-6.3711));
    }

    #[test]
    fn zero_cost_basis_has_zero_percent() {
        let metric =
            position_metric(U256::ZERO, u("5000000000000000000"), 18, u("1000"), 18).unwrap();

        assert_eq!(metric.price_paid, Decimal::ZERO);
        assert_eq!(metric.pnl_percent, Decimal::ZERO);
        assert!(metric.pnl > Decimal::ZERO);
    }

    #[test]
    fn buy_accumulates_cost_basis() {
        let now = Utc::now();
        let mut position = Position::open(Address::repeat_byte(1), now);
        position.record_buy(u("1000"), u("50"), now);
        position.record_buy(u("500"), u("25"), now);

        assert_eq!(position.book_value, u("1500"));
        assert_eq!(position.token_bought, u("75"));
    }

    #[test]
    fn partial_sell_releases_proportional_book_value() {
        let now = Utc::now();
        let mut position = Position::open(Address::repeat_byte(1), now);
        position.record_buy(u("2000000000000000"), u("400"), now);

        position
            .record_sell(u("100"), dec!(0.0004), 18, now)
            .unwrap();

        assert_eq!(position.book_value, u("1500000000000000"));
        assert_eq!(position.token_sold, u("100"));
        assert_eq!(position.realized_pnl, I256::try_from(100_000_000_000_000i64).unwrap());
    }

    #[test]
    fn oversell_caps_fraction_at_one() {
        let now = Utc::now();
        let mut position = Position::open(Address::repeat_byte(1), now);
        position.record_buy(u("1000"), u("10"), now);

        position.record_sell(u("12"), dec!(-0.5), 3, now).unwrap();

        assert_eq!(position.book_value, U256::ZERO);
        assert_eq!(position.token_sold, u("12"));
        assert_eq!(position.realized_pnl, I256::try_from(-500i64).unwrap());
    }

    #[test]
    fn sell_without_bought_tokens_realizes_nothing() {
        let now = Utc::now();
        let mut position = Position::open(Address::repeat_byte(1), now);
        position.record_sell(u("5"), dec!(1), 18, now).unwrap();

        assert_eq!(position.realized_pnl, I256::ZERO);
        assert_eq!(position.token_sold, u("5"));
    }

    #[test]
    fn fractional_balance_is_not_valued() {
        let metric =
            position_metric(u("100"), u("999999999999999999"), 18, u("1000000"), 18).unwrap();

        assert_eq!(metric.market_value, Decimal::ZERO);
        assert_eq!(metric.pnl_percent, dec!(-100));
    }
}
