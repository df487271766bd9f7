//! Trade settings table.

use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::codec::{parse_decimal, ts};
use super::database::connection::DbPool;
use super::database::model::TradeSettingRow;
use super::database::schema::trade_settings;
use crate::domain::setting::SettingName;
use crate::error::Result;

#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: DbPool,
}

impl SqliteSettingsStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get(&self, name: SettingName) -> Result<Option<Decimal>> {
        let mut conn = self.pool.get()?;
        let row: Option<TradeSettingRow> = trade_settings::table
            .find(name.as_str())
            .select(TradeSettingRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| parse_decimal(&row.value)).transpose()
    }

    pub fn set(&self, name: SettingName, value: Decimal) -> Result<()> {
        let row = TradeSettingRow {
            name: name.as_str().to_string(),
            value: value.to_string(),
            updated_at: ts(Utc::now()),
        };
        let mut conn = self.pool.get()?;
        diesel::replace_into(trade_settings::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
