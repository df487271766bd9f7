//! Database model types for Diesel ORM.
//!
//! Amounts are stored as decimal text, timestamps as RFC 3339 text with
//! microsecond precision, and JSON blobs as text.

use diesel::prelude::*;

use super::schema::{
    closed_positions, jobs, pair_price_alerts, pair_quotes, pairs, positions, strategy_states,
    tokens, trade_settings, transactions,
};

/// Database row for a job (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = jobs)]
pub struct NewJobRow {
    pub queue: String,
    pub job_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: String,
    pub expire_at: Option<String>,
}

/// Database row for a job (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRow {
    pub id: i64,
    pub queue: String,
    pub job_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: String,
    pub acked_at: Option<String>,
    pub completed_at: Option<String>,
    pub expire_at: Option<String>,
    pub execution_data: Option<String>,
}

/// Database row for a token.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = tokens)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TokenRow {
    pub address: String,
    pub symbol: String,
    pub name: String,
    pub decimals: i32,
    pub balance: String,
    pub latest_price_usd: Option<String>,
}

/// Database row for a pair.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = pairs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PairRow {
    pub address: String,
    pub base_address: String,
    pub quote_address: String,
    pub dex: String,
    pub chain: String,
    pub strategy: Option<String>,
    pub message_id: Option<String>,
}

/// Database row for a pair quote (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pair_quotes)]
pub struct NewPairQuoteRow {
    pub pair_address: String,
    pub price: String,
    pub raw_data: String,
    pub data_hash: String,
    pub timestamp: String,
}

/// Database row for a pair quote (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pair_quotes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PairQuoteRow {
    pub id: i64,
    pub pair_address: String,
    pub price: String,
    pub raw_data: String,
    pub data_hash: String,
    pub timestamp: String,
}

/// Database row for an open position.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub pair_address: String,
    pub token_bought: String,
    pub token_sold: String,
    pub book_value: String,
    pub realized_pnl: String,
    pub created_at: String,
    pub last_action_at: String,
}

/// Database row for an archived position (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = closed_positions)]
pub struct NewClosedPositionRow {
    pub pair_address: String,
    pub data: String,
    pub created_at: String,
}

/// Database row for an archived position (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = closed_positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClosedPositionRow {
    pub id: i64,
    pub pair_address: String,
    pub data: String,
    pub created_at: String,
}

/// Database row for a price alert (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = pair_price_alerts)]
pub struct NewPriceAlertRow {
    pub pair_address: String,
    pub price: String,
    pub pnl: String,
    pub pnl_percent: String,
    pub created_at: String,
}

/// Database row for a price alert (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = pair_price_alerts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceAlertRow {
    pub id: i64,
    pub pair_address: String,
    pub price: String,
    pub pnl: String,
    pub pnl_percent: String,
    pub created_at: String,
}

/// Database row for persisted strategy state.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = strategy_states)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct StrategyStateRow {
    pub pair_address: String,
    pub strategy_name: String,
    pub data: String,
    pub updated_at: String,
}

/// Database row for a trade setting.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = trade_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TradeSettingRow {
    pub name: String,
    pub value: String,
    pub updated_at: String,
}

/// Database row for an audited transaction.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub hash: String,
    pub block_number: Option<i64>,
    pub status: Option<String>,
    pub details: Option<String>,
    pub params: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
