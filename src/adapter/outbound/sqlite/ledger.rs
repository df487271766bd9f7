//! SQLite ledger store.
//!
//! Tokens, pairs, the quote time series, open and closed positions and
//! price alerts.

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use tracing::debug;

use super::codec::{
    addr, parse_addr, parse_decimal, parse_i256, parse_json, parse_ts, parse_u256, ts,
};
use super::database::connection::DbPool;
use super::database::model::{
    ClosedPositionRow, NewClosedPositionRow, NewPairQuoteRow, NewPriceAlertRow, PairQuoteRow,
    PairRow, PositionRow, PriceAlertRow, TokenRow,
};
use super::database::schema::{
    closed_positions, pair_price_alerts, pair_quotes, pairs, positions, strategy_states, tokens,
};
use crate::domain::pair::{DexId, Pair, PairPriceAlert, PairQuote, Token};
use crate::domain::position::Position;
use crate::domain::settlement::{PositionChange, Settlement};
use crate::error::{Error, Result};

/// SQLite-backed store for tokens, pairs, quotes and positions.
#[derive(Clone)]
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------------

    /// Insert a token or overwrite its metadata and balance.
    pub fn upsert_token(&self, token: &Token) -> Result<()> {
        let row = token_to_row(token);
        let mut conn = self.pool.get()?;
        diesel::insert_into(tokens::table)
            .values(&row)
            .on_conflict(tokens::address)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn get_token(&self, address: &Address) -> Result<Option<Token>> {
        let mut conn = self.pool.get()?;
        tokens::table
            .find(addr(address))
            .select(TokenRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(token_from_row)
            .transpose()
    }

    pub fn list_tokens(&self) -> Result<Vec<Token>> {
        let mut conn = self.pool.get()?;
        tokens::table
            .order(tokens::address.asc())
            .select(TokenRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(token_from_row)
            .collect()
    }

    /// Overwrite a token's balance. Returns `false` if the token is unknown.
    ///
    /// Seeding and test support. Handlers write balances through a
    /// [`Settlement`](crate::domain::settlement::Settlement).
    pub fn set_token_balance(&self, address: &Address, balance: U256) -> Result<bool> {
        let mut conn = self.pool.get()?;
        Ok(write_balance(&mut conn, address, balance)? > 0)
    }

    /// Record a token's latest USD price. Returns `false` if the token is
    /// unknown.
    pub fn set_token_price_usd(&self, address: &Address, price: Decimal) -> Result<bool> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(tokens::table.find(addr(address)))
            .set(tokens::latest_price_usd.eq(Some(price.to_string())))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    // ------------------------------------------------------------------------
    // Pairs
    // ------------------------------------------------------------------------

    /// Insert a pair or overwrite its attributes, keeping its history.
    ///
    /// Pair tracking belongs to the operator front end; the engine only
    /// reads pairs. Used for seeding and by tests.
    pub fn upsert_pair(&self, pair: &Pair) -> Result<()> {
        let row = pair_to_row(pair);
        let mut conn = self.pool.get()?;
        diesel::insert_into(pairs::table)
            .values(&row)
            .on_conflict(pairs::address)
            .do_update()
            .set((
                pairs::base_address.eq(&row.base_address),
                pairs::quote_address.eq(&row.quote_address),
                pairs::dex.eq(&row.dex),
                pairs::chain.eq(&row.chain),
                pairs::strategy.eq(&row.strategy),
                pairs::message_id.eq(&row.message_id),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn get_pair(&self, address: &Address) -> Result<Option<Pair>> {
        let mut conn = self.pool.get()?;
        pairs::table
            .find(addr(address))
            .select(PairRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(pair_from_row)
            .transpose()
    }

    pub fn list_pairs(&self) -> Result<Vec<Pair>> {
        let mut conn = self.pool.get()?;
        pairs::table
            .order(pairs::address.asc())
            .select(PairRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(pair_from_row)
            .collect()
    }

    /// Pairs carrying a non-empty strategy assignment.
    pub fn list_strategized_pairs(&self) -> Result<Vec<Pair>> {
        let mut conn = self.pool.get()?;
        pairs::table
            .filter(pairs::strategy.is_not_null())
            .filter(pairs::strategy.ne(""))
            .order(pairs::address.asc())
            .select(PairRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(pair_from_row)
            .collect()
    }

    /// Assign or clear a pair's strategy. Returns `false` if the pair is unknown.
    pub fn set_pair_strategy(&self, address: &Address, strategy: Option<&str>) -> Result<bool> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(pairs::table.find(addr(address)))
            .set(pairs::strategy.eq(strategy))
            .execute(&mut conn)?;
        Ok(updated > 0)
    }

    /// Delete a pair with its quotes, position, alerts and strategy state.
    ///
    /// Operator front end and test support, like [`Self::upsert_pair`].
    pub fn delete_pair(&self, address: &Address) -> Result<bool> {
        let key = addr(address);
        let mut conn = self.pool.get()?;
        let deleted = conn.transaction(|conn| {
            diesel::delete(pair_quotes::table.filter(pair_quotes::pair_address.eq(&key)))
                .execute(conn)?;
            diesel::delete(
                pair_price_alerts::table.filter(pair_price_alerts::pair_address.eq(&key)),
            )
            .execute(conn)?;
            diesel::delete(strategy_states::table.filter(strategy_states::pair_address.eq(&key)))
                .execute(conn)?;
            diesel::delete(positions::table.find(&key)).execute(conn)?;
            diesel::delete(pairs::table.find(&key)).execute(conn)
        })?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------------
    // Quotes
    // ------------------------------------------------------------------------

    /// Append a quote unless one with the same content hash is stored.
    ///
    /// Returns `true` when a new row was written.
    pub fn insert_quote(&self, quote: &PairQuote) -> Result<bool> {
        let row = NewPairQuoteRow {
            pair_address: addr(&quote.pair_address),
            price: quote.price.to_string(),
            raw_data: serde_json::to_string(&quote.raw_data)?,
            data_hash: quote.data_hash.clone(),
            timestamp: ts(quote.timestamp),
        };
        let mut conn = self.pool.get()?;
        let inserted = diesel::insert_or_ignore_into(pair_quotes::table)
            .values(&row)
            .execute(&mut conn)?;
        if inserted == 0 {
            debug!(pair = %quote.pair_address, hash = %quote.data_hash, "Duplicate quote skipped");
        }
        Ok(inserted > 0)
    }

    pub fn latest_quote(&self, pair: &Address) -> Result<Option<PairQuote>> {
        let mut conn = self.pool.get()?;
        pair_quotes::table
            .filter(pair_quotes::pair_address.eq(addr(pair)))
            .order((pair_quotes::timestamp.desc(), pair_quotes::id.desc()))
            .select(PairQuoteRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(quote_from_row)
            .transpose()
    }

    /// Test support.
    pub fn count_quotes(&self, pair: &Address) -> Result<i64> {
        let mut conn = self.pool.get()?;
        Ok(pair_quotes::table
            .filter(pair_quotes::pair_address.eq(addr(pair)))
            .count()
            .get_result(&mut conn)?)
    }

    /// Delete quotes observed before `cutoff`. Returns the number removed.
    pub fn purge_quotes_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.pool.get()?;
        Ok(
            diesel::delete(pair_quotes::table.filter(pair_quotes::timestamp.lt(ts(cutoff))))
                .execute(&mut conn)?,
        )
    }

    // ------------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------------

    pub fn get_position(&self, pair: &Address) -> Result<Option<Position>> {
        let mut conn = self.pool.get()?;
        positions::table
            .find(addr(pair))
            .select(PositionRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(position_from_row)
            .transpose()
    }

    /// Test support. Handlers persist positions through a
    /// [`Settlement`](crate::domain::settlement::Settlement).
    pub fn save_position(&self, position: &Position) -> Result<()> {
        let mut conn = self.pool.get()?;
        write_position(&mut conn, position)
    }

    /// Archived snapshots for a pair, oldest first.
    pub fn closed_positions(&self, pair: &Address) -> Result<Vec<Position>> {
        let mut conn = self.pool.get()?;
        closed_positions::table
            .filter(closed_positions::pair_address.eq(addr(pair)))
            .order(closed_positions::id.asc())
            .select(ClosedPositionRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(|row| serde_json::from_str(&row.data).map_err(Error::from))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Price alerts
    // ------------------------------------------------------------------------

    pub fn insert_price_alert(&self, alert: &PairPriceAlert) -> Result<()> {
        let row = NewPriceAlertRow {
            pair_address: addr(&alert.pair_address),
            price: alert.price.to_string(),
            pnl: alert.pnl.to_string(),
            pnl_percent: alert.pnl_percent.to_string(),
            created_at: ts(alert.created_at),
        };
        let mut conn = self.pool.get()?;
        diesel::insert_into(pair_price_alerts::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    pub fn latest_price_alert(&self, pair: &Address) -> Result<Option<PairPriceAlert>> {
        let mut conn = self.pool.get()?;
        pair_price_alerts::table
            .filter(pair_price_alerts::pair_address.eq(addr(pair)))
            .order((pair_price_alerts::created_at.desc(), pair_price_alerts::id.desc()))
            .select(PriceAlertRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(alert_from_row)
            .transpose()
    }
}

/// Writes a settlement's balances and position change on `conn`.
///
/// Must run inside the caller's transaction.
pub(super) fn apply_ledger_changes(
    conn: &mut SqliteConnection,
    settlement: &Settlement,
    now: DateTime<Utc>,
) -> Result<()> {
    for (token, balance) in &settlement.balances {
        if write_balance(conn, token, *balance)? == 0 {
            return Err(Error::Database(format!("unknown token {token}")));
        }
    }

    match &settlement.position {
        Some(PositionChange::Upsert(position)) => write_position(conn, position)?,
        Some(PositionChange::Close(position)) => {
            let key = addr(&position.pair_address);
            diesel::insert_into(closed_positions::table)
                .values(&NewClosedPositionRow {
                    pair_address: key.clone(),
                    data: serde_json::to_string(position)?,
                    created_at: ts(now),
                })
                .execute(conn)?;
            diesel::delete(positions::table.find(&key)).execute(conn)?;
        }
        None => {}
    }
    Ok(())
}

fn write_balance(conn: &mut SqliteConnection, token: &Address, balance: U256) -> Result<usize> {
    Ok(diesel::update(tokens::table.find(addr(token)))
        .set(tokens::balance.eq(balance.to_string()))
        .execute(conn)?)
}

fn write_position(conn: &mut SqliteConnection, position: &Position) -> Result<()> {
    diesel::replace_into(positions::table)
        .values(&position_to_row(position))
        .execute(conn)?;
    Ok(())
}

fn token_to_row(token: &Token) -> TokenRow {
    TokenRow {
        address: addr(&token.address),
        symbol: token.symbol.clone(),
        name: token.name.clone(),
        decimals: i32::from(token.decimals),
        balance: token.balance.to_string(),
        latest_price_usd: token.latest_price_usd.map(|p| p.to_string()),
    }
}

fn token_from_row(row: TokenRow) -> Result<Token> {
    Ok(Token {
        address: parse_addr(&row.address)?,
        symbol: row.symbol,
        name: row.name,
        decimals: u8::try_from(row.decimals)
            .map_err(|_| Error::Parse(format!("token decimals {}", row.decimals)))?,
        balance: parse_u256(&row.balance)?,
        latest_price_usd: row.latest_price_usd.as_deref().map(parse_decimal).transpose()?,
    })
}

fn pair_to_row(pair: &Pair) -> PairRow {
    PairRow {
        address: addr(&pair.address),
        base_address: addr(&pair.base_address),
        quote_address: addr(&pair.quote_address),
        dex: pair.dex.to_string(),
        chain: pair.chain.clone(),
        strategy: pair.strategy.clone(),
        message_id: pair.message_id.clone(),
    }
}

fn pair_from_row(row: PairRow) -> Result<Pair> {
    Ok(Pair {
        address: parse_addr(&row.address)?,
        base_address: parse_addr(&row.base_address)?,
        quote_address: parse_addr(&row.quote_address)?,
        dex: row.dex.parse::<DexId>()?,
        chain: row.chain,
        strategy: row.strategy,
        message_id: row.message_id,
    })
}

fn quote_from_row(row: PairQuoteRow) -> Result<PairQuote> {
    Ok(PairQuote {
        pair_address: parse_addr(&row.pair_address)?,
        price: parse_u256(&row.price)?,
        raw_data: parse_json(&row.raw_data)?,
        data_hash: row.data_hash,
        timestamp: parse_ts(&row.timestamp)?,
    })
}

fn position_to_row(position: &Position) -> PositionRow {
    PositionRow {
        pair_address: addr(&position.pair_address),
        token_bought: position.token_bought.to_string(),
        token_sold: position.token_sold.to_string(),
        book_value: position.book_value.to_string(),
        realized_pnl: position.realized_pnl.to_string(),
        created_at: ts(position.created_at),
        last_action_at: ts(position.last_action_at),
    }
}

fn position_from_row(row: PositionRow) -> Result<Position> {
    Ok(Position {
        pair_address: parse_addr(&row.pair_address)?,
        token_bought: parse_u256(&row.token_bought)?,
        token_sold: parse_u256(&row.token_sold)?,
        book_value: parse_u256(&row.book_value)?,
        realized_pnl: parse_i256(&row.realized_pnl)?,
        created_at: parse_ts(&row.created_at)?,
        last_action_at: parse_ts(&row.last_action_at)?,
    })
}

fn alert_from_row(row: PriceAlertRow) -> Result<PairPriceAlert> {
    Ok(PairPriceAlert {
        pair_address: parse_addr(&row.pair_address)?,
        price: parse_u256(&row.price)?,
        pnl: parse_decimal(&row.pnl)?,
        pnl_percent: parse_decimal(&row.pnl_percent)?,
        created_at: parse_ts(&row.created_at)?,
    })
}
