//! Transaction audit log.

use chrono::Utc;
use diesel::prelude::*;

use super::codec::{parse_json, ts};
use super::database::connection::DbPool;
use super::database::model::TransactionRow;
use super::database::schema::transactions;
use crate::domain::trade::TransactionRecord;
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct SqliteTransactionLog {
    pool: DbPool,
}

impl SqliteTransactionLog {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert or merge an entry by hash.
    pub fn record(&self, record: &TransactionRecord) -> Result<()> {
        let now = ts(Utc::now());
        let params = record.params.as_ref().map(serde_json::to_string).transpose()?;
        let block_number = record
            .block_number
            .map(i64::try_from)
            .transpose()
            .map_err(|e| Error::Parse(e.to_string()))?;

        let mut conn = self.pool.get()?;
        conn.transaction(|conn| {
            let existing: Option<TransactionRow> = transactions::table
                .find(&record.hash)
                .select(TransactionRow::as_select())
                .first(conn)
                .optional()?;

            let row = match existing {
                Some(old) => TransactionRow {
                    hash: old.hash,
                    block_number: block_number.or(old.block_number),
                    status: record.status.clone().or(old.status),
                    details: record.details.clone().or(old.details),
                    params: params.clone().or(old.params),
                    created_at: old.created_at,
                    updated_at: now.clone(),
                },
                None => TransactionRow {
                    hash: record.hash.clone(),
                    block_number,
                    status: record.status.clone(),
                    details: record.details.clone(),
                    params: params.clone(),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                },
            };

            diesel::replace_into(transactions::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }

    pub fn get(&self, hash: &str) -> Result<Option<TransactionRecord>> {
        let mut conn = self.pool.get()?;
        let row: Option<TransactionRow> = transactions::table
            .find(hash)
            .select(TransactionRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| -> Result<TransactionRecord> {
            Ok(TransactionRecord {
                hash: row.hash,
                block_number: row.block_number.and_then(|n| u64::try_from(n).ok()),
                status: row.status,
                details: row.details,
                params: row.params.as_deref().map(parse_json).transpose()?,
            })
        })
        .transpose()
    }
}
