//! PostgreSQL store.
//!
//! Each entity table has the layout created by the migrations: a
//! `BIGSERIAL` identity, a `version` column guarding updates, and the
//! serialized entity in a `JSONB` column.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tickethub_core::error::{AppError, ErrorKind};
use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityId;
use tickethub_entity::tables;

use super::{Row, Store, StoreTransaction, ensure_active, missing_row, version_conflict};
use crate::connection::DatabasePool;

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an open pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Wrap a [`DatabasePool`].
    pub fn from_pool(pool: &DatabasePool) -> Self {
        Self::new(pool.pool().clone())
    }
}

#[async_trait]
impl Store for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self, cancel: &CancellationToken) -> AppResult<Box<dyn StoreTransaction>> {
        ensure_active(cancel)?;
        let tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;
        Ok(Box::new(PgTransaction {
            tx: Some(tx),
            cancel: cancel.clone(),
        }))
    }
}

/// A transaction on a [`PgStore`].
///
/// Dropping it without committing rolls the database transaction back.
pub struct PgTransaction {
    tx: Option<Transaction<'static, Postgres>>,
    cancel: CancellationToken,
}

type RowTuple = (i64, i64, Value);

fn from_tuple((id, version, payload): RowTuple) -> Row {
    Row {
        id,
        version,
        payload,
    }
}

fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, format!("{context}: {e}"), e)
}

/// Table names are interpolated into SQL, so only known tables pass.
fn checked(table: &'static str) -> AppResult<&'static str> {
    if tables::ALL.contains(&table) {
        Ok(table)
    } else {
        Err(AppError::internal(format!("unknown table '{table}'")))
    }
}

impl PgTransaction {
    fn conn(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        ensure_active(&self.cancel)?;
        self.tx
            .as_mut()
            .ok_or_else(|| AppError::transaction("transaction already finished"))
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn scan(&mut self, table: &'static str) -> AppResult<Vec<Row>> {
        let sql = format!("SELECT id, version, data FROM {} ORDER BY id", checked(table)?);
        let rows = sqlx::query_as::<_, RowTuple>(&sql)
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to scan table"))?;
        Ok(rows.into_iter().map(from_tuple).collect())
    }

    async fn fetch(&mut self, table: &'static str, id: EntityId) -> AppResult<Option<Row>> {
        let sql = format!("SELECT id, version, data FROM {} WHERE id = $1", checked(table)?);
        let row = sqlx::query_as::<_, RowTuple>(&sql)
            .bind(id)
            .fetch_optional(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to fetch row"))?;
        Ok(row.map(from_tuple))
    }

    async fn fetch_many(&mut self, table: &'static str, ids: &[EntityId]) -> AppResult<Vec<Row>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id, version, data FROM {} WHERE id = ANY($1) ORDER BY id",
            checked(table)?
        );
        let rows = sqlx::query_as::<_, RowTuple>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to fetch rows"))?;
        Ok(rows.into_iter().map(from_tuple).collect())
    }

    async fn insert(&mut self, table: &'static str, payload: Value) -> AppResult<Row> {
        let sql = format!(
            "INSERT INTO {} (version, data) VALUES (1, $1) RETURNING id, version, data",
            checked(table)?
        );
        let row = sqlx::query_as::<_, RowTuple>(&sql)
            .bind(payload)
            .fetch_one(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to insert row"))?;
        Ok(from_tuple(row))
    }

    async fn update(
        &mut self,
        table: &'static str,
        id: EntityId,
        expected_version: i64,
        payload: Value,
    ) -> AppResult<Row> {
        let table = checked(table)?;
        let sql = format!(
            "UPDATE {table} SET data = $1, version = version + 1, written_at = NOW() \
             WHERE id = $2 AND version = $3 RETURNING id, version, data"
        );
        let updated = sqlx::query_as::<_, RowTuple>(&sql)
            .bind(payload)
            .bind(id)
            .bind(expected_version)
            .fetch_optional(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to update row"))?;
        if let Some(row) = updated {
            return Ok(from_tuple(row));
        }

        let probe = format!("SELECT version FROM {table} WHERE id = $1");
        let current = sqlx::query_scalar::<_, i64>(&probe)
            .bind(id)
            .fetch_optional(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to read row version"))?;
        Err(match current {
            Some(actual) => version_conflict(table, id, expected_version, actual),
            None => missing_row(table, id),
        })
    }

    async fn delete(&mut self, table: &'static str, id: EntityId) -> AppResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", checked(table)?);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&mut **self.conn()?)
            .await
            .map_err(db_error("Failed to delete row"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit(&mut self) -> AppResult<()> {
        ensure_active(&self.cancel)?;
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::transaction("transaction already finished"))?;
        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Transaction, format!("Commit failed: {e}"), e)
        })?;
        debug!("PostgreSQL transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| AppError::transaction("transaction already finished"))?;
        tx.rollback().await.map_err(|e| {
            AppError::with_source(ErrorKind::Transaction, format!("Rollback failed: {e}"), e)
        })?;
        debug!("PostgreSQL transaction rolled back");
        Ok(())
    }
}
