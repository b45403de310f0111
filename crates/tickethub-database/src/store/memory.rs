//! Process-local store.
//!
//! Each transaction works on private copies of the tables it touches and
//! keeps a journal of its writes. Commit replays the journal against the
//! live tables under a write lock, re-checking every version guard, and
//! swaps the result in only when every write succeeds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityId;

use super::{Row, Store, StoreTransaction, ensure_active, missing_row, version_conflict};

#[derive(Debug, Clone)]
struct Stored {
    version: i64,
    payload: Value,
}

type Table = BTreeMap<EntityId, Stored>;

#[derive(Debug, Default)]
struct Faults {
    commit: Option<String>,
    rollback: Option<String>,
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<HashMap<&'static str, Table>>,
    sequence: AtomicI64,
    faults: Mutex<Faults>,
}

impl Shared {
    fn take_fault(&self, pick: impl FnOnce(&mut Faults) -> Option<String>) -> Option<String> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        pick(&mut faults)
    }
}

/// In-memory [`Store`]. Clones share the same tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(HashMap::new()),
                sequence: AtomicI64::new(1),
                faults: Mutex::new(Faults::default()),
            }),
        }
    }

    /// Make the next commit fail with a `Transaction` error, leaving the
    /// transaction open so that it can be rolled back.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        let mut faults = self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.commit = Some(message.into());
    }

    /// Make the next rollback report a `Transaction` error after discarding.
    pub fn fail_next_rollback(&self, message: impl Into<String>) {
        let mut faults = self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner);
        faults.rollback = Some(message.into());
    }

    /// Number of committed rows in `table`.
    pub async fn len(&self, table: &str) -> usize {
        self.shared
            .tables
            .read()
            .await
            .get(table)
            .map_or(0, BTreeMap::len)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self, cancel: &CancellationToken) -> AppResult<Box<dyn StoreTransaction>> {
        ensure_active(cancel)?;
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            cancel: cancel.clone(),
            working: HashMap::new(),
            journal: Vec::new(),
            finished: false,
        }))
    }
}

#[derive(Debug)]
enum Write {
    Insert {
        table: &'static str,
        id: EntityId,
        stored: Stored,
    },
    Update {
        table: &'static str,
        id: EntityId,
        expected: i64,
        stored: Stored,
    },
    Delete {
        table: &'static str,
        id: EntityId,
    },
}

impl Write {
    fn table(&self) -> &'static str {
        match self {
            Self::Insert { table, .. } | Self::Update { table, .. } | Self::Delete { table, .. } => {
                *table
            }
        }
    }
}

/// A transaction on a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    working: HashMap<&'static str, Table>,
    journal: Vec<Write>,
    finished: bool,
}

impl MemoryTransaction {
    fn guard(&self) -> AppResult<()> {
        if self.finished {
            return Err(AppError::transaction("transaction already finished"));
        }
        ensure_active(&self.cancel)
    }

    async fn table(&mut self, table: &'static str) -> AppResult<&mut Table> {
        self.guard()?;
        if !self.working.contains_key(table) {
            let snapshot = self
                .shared
                .tables
                .read()
                .await
                .get(table)
                .cloned()
                .unwrap_or_default();
            self.working.insert(table, snapshot);
        }
        Ok(self.working.entry(table).or_default())
    }

    fn finish(&mut self) {
        self.finished = true;
        self.working.clear();
        self.journal.clear();
    }
}

fn to_row(id: EntityId, stored: &Stored) -> Row {
    Row {
        id,
        version: stored.version,
        payload: stored.payload.clone(),
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn scan(&mut self, table: &'static str) -> AppResult<Vec<Row>> {
        let rows = self.table(table).await?;
        Ok(rows.iter().map(|(id, stored)| to_row(*id, stored)).collect())
    }

    async fn fetch(&mut self, table: &'static str, id: EntityId) -> AppResult<Option<Row>> {
        let rows = self.table(table).await?;
        Ok(rows.get(&id).map(|stored| to_row(id, stored)))
    }

    async fn fetch_many(&mut self, table: &'static str, ids: &[EntityId]) -> AppResult<Vec<Row>> {
        let wanted: BTreeSet<EntityId> = ids.iter().copied().collect();
        let rows = self.table(table).await?;
        Ok(wanted
            .into_iter()
            .filter_map(|id| rows.get(&id).map(|stored| to_row(id, stored)))
            .collect())
    }

    async fn insert(&mut self, table: &'static str, payload: Value) -> AppResult<Row> {
        let id = self.shared.sequence.fetch_add(1, Ordering::Relaxed);
        let stored = Stored {
            version: 1,
            payload,
        };
        let rows = self.table(table).await?;
        rows.insert(id, stored.clone());
        let row = to_row(id, &stored);
        self.journal.push(Write::Insert { table, id, stored });
        Ok(row)
    }

    async fn update(
        &mut self,
        table: &'static str,
        id: EntityId,
        expected_version: i64,
        payload: Value,
    ) -> AppResult<Row> {
        let rows = self.table(table).await?;
        let current = rows.get(&id).ok_or_else(|| missing_row(table, id))?;
        if current.version != expected_version {
            return Err(version_conflict(table, id, expected_version, current.version));
        }
        let stored = Stored {
            version: expected_version + 1,
            payload,
        };
        rows.insert(id, stored.clone());
        let row = to_row(id, &stored);
        self.journal.push(Write::Update {
            table,
            id,
            expected: expected_version,
            stored,
        });
        Ok(row)
    }

    async fn delete(&mut self, table: &'static str, id: EntityId) -> AppResult<bool> {
        let rows = self.table(table).await?;
        let existed = rows.remove(&id).is_some();
        if existed {
            self.journal.push(Write::Delete { table, id });
        }
        Ok(existed)
    }

    async fn commit(&mut self) -> AppResult<()> {
        self.guard()?;
        if let Some(message) = self.shared.take_fault(|f| f.commit.take()) {
            return Err(AppError::transaction(message));
        }

        let mut tables = self.shared.tables.write().await;
        let mut staged: HashMap<&'static str, Table> = HashMap::new();
        for write in &self.journal {
            let name = write.table();
            let rows = staged
                .entry(name)
                .or_insert_with(|| tables.get(name).cloned().unwrap_or_default());
            match write {
                Write::Insert { id, stored, .. } => {
                    rows.insert(*id, stored.clone());
                }
                Write::Update {
                    table,
                    id,
                    expected,
                    stored,
                } => {
                    let current = rows.get(id).ok_or_else(|| missing_row(table, *id))?;
                    if current.version != *expected {
                        return Err(version_conflict(table, *id, *expected, current.version));
                    }
                    rows.insert(*id, stored.clone());
                }
                Write::Delete { id, .. } => {
                    rows.remove(id);
                }
            }
        }

        let writes = self.journal.len();
        tables.extend(staged);
        drop(tables);
        self.finish();
        debug!(writes, "Memory transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> AppResult<()> {
        if self.finished {
            return Err(AppError::transaction("transaction already finished"));
        }
        let discarded = self.journal.len();
        self.finish();
        debug!(discarded, "Memory transaction rolled back");
        match self.shared.take_fault(|f| f.rollback.take()) {
            Some(message) => Err(AppError::transaction(message)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickethub_core::error::ErrorKind;

    const PARCELS: &str = "parcels";

    async fn seeded(store: &MemoryStore, weight: i64) -> Row {
        let mut tx = store.begin(&CancellationToken::new()).await.expect("begin");
        let row = tx
            .insert(PARCELS, json!({ "weight": weight }))
            .await
            .expect("insert");
        tx.commit().await.expect("commit");
        row
    }

    #[tokio::test]
    async fn test_writes_are_invisible_until_commit() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let mut writer = store.begin(&cancel).await.expect("begin");
        let row = writer.insert(PARCELS, json!({ "weight": 3 })).await.expect("insert");
        assert_eq!(row.version, 1);
        assert_eq!(writer.scan(PARCELS).await.expect("scan").len(), 1);

        let mut reader = store.begin(&cancel).await.expect("begin");
        assert!(reader.fetch(PARCELS, row.id).await.expect("fetch").is_none());

        writer.commit().await.expect("commit");
        assert_eq!(store.len(PARCELS).await, 1);
    }

    #[tokio::test]
    async fn test_identities_are_never_reused() {
        let store = MemoryStore::new();
        let first = seeded(&store, 1).await;

        let mut tx = store.begin(&CancellationToken::new()).await.expect("begin");
        assert!(tx.delete(PARCELS, first.id).await.expect("delete"));
        tx.commit().await.expect("commit");

        let second = seeded(&store, 2).await;
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_stale_version_is_a_conflict_at_commit() {
        let store = MemoryStore::new();
        let row = seeded(&store, 1).await;
        let cancel = CancellationToken::new();

        let mut slow = store.begin(&cancel).await.expect("begin");
        slow.update(PARCELS, row.id, 1, json!({ "weight": 10 }))
            .await
            .expect("staged");

        let mut fast = store.begin(&cancel).await.expect("begin");
        fast.update(PARCELS, row.id, 1, json!({ "weight": 20 }))
            .await
            .expect("staged");
        fast.commit().await.expect("commit");

        let err = slow.commit().await.expect_err("stale");
        assert_eq!(err.kind, ErrorKind::ConcurrencyConflict);
        slow.rollback().await.expect("rollback");

        let mut check = store.begin(&cancel).await.expect("begin");
        let stored = check.fetch(PARCELS, row.id).await.expect("fetch").expect("row");
        assert_eq!(stored.version, 2);
        assert_eq!(stored.payload["weight"], 20);
    }

    #[tokio::test]
    async fn test_update_of_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let mut tx = store.begin(&CancellationToken::new()).await.expect("begin");
        let err = tx
            .update(PARCELS, 99, 1, json!({}))
            .await
            .expect_err("missing");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_injected_commit_failure_keeps_transaction_open() {
        let store = MemoryStore::new();
        store.fail_next_commit("disk full");
        let mut tx = store.begin(&CancellationToken::new()).await.expect("begin");
        tx.insert(PARCELS, json!({ "weight": 1 })).await.expect("insert");
        let err = tx.commit().await.expect_err("injected");
        assert_eq!(err.kind, ErrorKind::Transaction);
        tx.rollback().await.expect("rollback");
        assert_eq!(store.len(PARCELS).await, 0);
        assert!(tx.rollback().await.is_err());
    }

    #[tokio::test]
    async fn test_cancelled_transaction_refuses_work() {
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        let mut tx = store.begin(&cancel).await.expect("begin");
        cancel.cancel();
        let err = tx.scan(PARCELS).await.expect_err("cancelled");
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(store.begin(&cancel).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_many_skips_missing_and_orders_by_id() {
        let store = MemoryStore::new();
        let a = seeded(&store, 1).await;
        let b = seeded(&store, 2).await;
        let mut tx = store.begin(&CancellationToken::new()).await.expect("begin");
        let rows = tx
            .fetch_many(PARCELS, &[b.id, 12345, a.id, b.id])
            .await
            .expect("fetch");
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }
}
