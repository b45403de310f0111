//! Store abstraction underneath the repositories.
//!
//! A [`Store`] hands out [`StoreTransaction`]s. Every read and write the
//! unit of work performs goes through one: reads outside an explicit
//! transaction use a short-lived one, writes are applied inside the
//! transaction that is then committed or rolled back as a whole.
//!
//! Rows are schemaless JSON documents keyed by a store-assigned identity
//! and guarded by a version counter. Filtering happens in process over
//! decoded entities, so a store only needs to scan and fetch by identity.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId};

/// One stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Store-assigned identity.
    pub id: EntityId,
    /// Version, starting at 1 and incremented by every update.
    pub version: i64,
    /// Serialized entity.
    pub payload: Value,
}

impl Row {
    /// Serialize an entity into a row payload.
    pub fn encode<T: Entity>(entity: &T) -> AppResult<Value> {
        Ok(serde_json::to_value(entity)?)
    }

    /// The payload with the store's identity and version written into it.
    ///
    /// The payload keeps whatever `id` and `version` the entity carried when
    /// it was serialized; the row columns are authoritative.
    pub fn into_json(self) -> Value {
        let mut payload = self.payload;
        if let Value::Object(map) = &mut payload {
            map.insert("id".to_string(), Value::from(self.id));
            map.insert("version".to_string(), Value::from(self.version));
        }
        payload
    }

    /// Decode the row into an entity.
    pub fn decode<T: Entity>(self) -> AppResult<T> {
        Ok(serde_json::from_value(self.into_json())?)
    }

    /// Read an integer field from the payload, e.g. a foreign key.
    pub fn field_id(&self, field: &str) -> Option<EntityId> {
        self.payload.get(field).and_then(Value::as_i64)
    }
}

/// A backend that can open transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Open a transaction. Every call made on it checks `cancel` first.
    async fn begin(&self, cancel: &CancellationToken) -> AppResult<Box<dyn StoreTransaction>>;
}

/// An open transaction against a [`Store`].
///
/// Writes are visible to later reads on the same transaction and to nobody
/// else until [`commit`](StoreTransaction::commit) succeeds. Once `commit`
/// or `rollback` has been called the transaction is finished and further
/// calls fail with a `Transaction` error.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Every row of `table`, in identity order.
    async fn scan(&mut self, table: &'static str) -> AppResult<Vec<Row>>;

    /// One row by identity.
    async fn fetch(&mut self, table: &'static str, id: EntityId) -> AppResult<Option<Row>>;

    /// Rows for a set of identities, in identity order. Missing ids are skipped.
    async fn fetch_many(&mut self, table: &'static str, ids: &[EntityId]) -> AppResult<Vec<Row>>;

    /// Insert a payload, assigning a fresh identity and version 1.
    async fn insert(&mut self, table: &'static str, payload: Value) -> AppResult<Row>;

    /// Replace a row's payload if its version still equals `expected_version`.
    ///
    /// Fails with `NotFound` when the row does not exist and with
    /// `ConcurrencyConflict` when the version has moved on.
    async fn update(
        &mut self,
        table: &'static str,
        id: EntityId,
        expected_version: i64,
        payload: Value,
    ) -> AppResult<Row>;

    /// Remove a row. Returns whether it existed.
    async fn delete(&mut self, table: &'static str, id: EntityId) -> AppResult<bool>;

    /// Make every write durable, or none of them.
    async fn commit(&mut self) -> AppResult<()>;

    /// Discard every write.
    async fn rollback(&mut self) -> AppResult<()>;
}

/// Fail with `Cancelled` once the token has fired.
pub(crate) fn ensure_active(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        return Err(AppError::cancelled("operation cancelled"));
    }
    Ok(())
}

/// Error for a concurrent modification of `table/id`.
pub(crate) fn version_conflict(table: &str, id: EntityId, expected: i64, actual: i64) -> AppError {
    AppError::concurrency_conflict(format!(
        "{table}/{id} was modified concurrently (expected version {expected}, found {actual})"
    ))
}

/// Error for a row that does not exist.
pub(crate) fn missing_row(table: &str, id: EntityId) -> AppError {
    AppError::not_found(format!("{table}/{id} does not exist"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_columns_override_payload_identity() {
        let row = Row {
            id: 42,
            version: 3,
            payload: json!({ "id": 0, "version": 0, "name": "Dock 7" }),
        };
        assert_eq!(row.field_id("id"), Some(0));
        let json = row.into_json();
        assert_eq!(json["id"], 42);
        assert_eq!(json["version"], 3);
        assert_eq!(json["name"], "Dock 7");
    }

    #[test]
    fn test_cancelled_token_is_rejected() {
        let token = CancellationToken::new();
        assert!(ensure_active(&token).is_ok());
        token.cancel();
        let err = ensure_active(&token).expect_err("cancelled");
        assert_eq!(err.kind, tickethub_core::error::ErrorKind::Cancelled);
    }
}
