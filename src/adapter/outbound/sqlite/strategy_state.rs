//! Persisted per-pair strategy state.

use alloy_primitives::Address;
use chrono::Utc;
use diesel::prelude::*;

use super::codec::{addr, ts};
use super::database::connection::DbPool;
use super::database::model::StrategyStateRow;
use super::database::schema::strategy_states;
use crate::domain::strategy::{StrategyKind, StrategyState};
use crate::error::Result;

#[derive(Clone)]
pub struct SqliteStrategyStateStore {
    pool: DbPool,
}

impl SqliteStrategyStateStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Stored state of `kind` for `pair`, if any.
    pub fn load(&self, pair: &Address, kind: StrategyKind) -> Result<Option<StrategyState>> {
        let mut conn = self.pool.get()?;
        let row: Option<StrategyStateRow> = strategy_states::table
            .find((addr(pair), kind.as_str()))
            .select(StrategyStateRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(|row| kind.decode_state(&row.data)).transpose()?)
    }

    /// Insert or replace the state of `pair`.
    pub fn save(&self, pair: &Address, state: &StrategyState) -> Result<()> {
        let row = StrategyStateRow {
            pair_address: addr(pair),
            strategy_name: state.kind().as_str().to_string(),
            data: state.encode()?,
            updated_at: ts(Utc::now()),
        };
        let mut conn = self.pool.get()?;
        diesel::replace_into(strategy_states::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
