//! State shared by one unit of work and its repositories.
//!
//! A [`Session`] owns the store handle, the cancellation token, the queue of
//! staged changes, and the explicit transaction (if any). Repositories hold
//! an `Arc<Session>`; the unit of work drives the commit boundary.

use std::mem;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, KeySlot};

use crate::store::{Row, Store, StoreTransaction, ensure_active, missing_row};

/// A staged write, applied in the order it was staged.
#[derive(Debug)]
pub(crate) enum Change {
    Insert {
        table: &'static str,
        payload: Value,
        slot: KeySlot,
    },
    Update {
        table: &'static str,
        id: EntityId,
        expected_version: i64,
        payload: Value,
        slot: KeySlot,
    },
    Delete {
        table: &'static str,
        id: EntityId,
        /// A missing row fails the save instead of being skipped.
        required: bool,
    },
}

#[derive(Default)]
struct State {
    pending: Vec<Change>,
    transaction: Option<Box<dyn StoreTransaction>>,
    /// Set when a save inside the explicit transaction failed part-way.
    doomed: bool,
    /// Handles filled by saves inside the explicit transaction; cleared
    /// again if it rolls back.
    provisional: Vec<KeySlot>,
}

/// Reads a repository can issue against the store.
enum Read<'a> {
    Scan(&'static str),
    Fetch(&'static str, EntityId),
    FetchMany(&'static str, &'a [EntityId]),
}

impl Read<'_> {
    async fn run(&self, tx: &mut dyn StoreTransaction) -> AppResult<Vec<Row>> {
        match self {
            Self::Scan(table) => tx.scan(*table).await,
            Self::Fetch(table, id) => Ok(tx.fetch(*table, *id).await?.into_iter().collect()),
            Self::FetchMany(table, ids) => tx.fetch_many(*table, ids).await,
        }
    }
}

/// Store access plus change tracking for one unit of work.
pub struct Session {
    store: Arc<dyn Store>,
    cancel: CancellationToken,
    max_page_size: u64,
    state: Mutex<State>,
}

impl Session {
    pub(crate) fn new(store: Arc<dyn Store>, cancel: CancellationToken, max_page_size: u64) -> Self {
        Self {
            store,
            cancel,
            max_page_size,
            state: Mutex::new(State::default()),
        }
    }

    /// Largest page size search criteria may request.
    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    /// The cancellation token checked before every store call.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub(crate) async fn scan(&self, table: &'static str) -> AppResult<Vec<Row>> {
        self.read(Read::Scan(table)).await
    }

    pub(crate) async fn fetch(&self, table: &'static str, id: EntityId) -> AppResult<Option<Row>> {
        Ok(self.read(Read::Fetch(table, id)).await?.into_iter().next())
    }

    pub(crate) async fn fetch_many(
        &self,
        table: &'static str,
        ids: &[EntityId],
    ) -> AppResult<Vec<Row>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.read(Read::FetchMany(table, ids)).await
    }

    /// Run a read inside the explicit transaction, or a short-lived one.
    async fn read(&self, read: Read<'_>) -> AppResult<Vec<Row>> {
        ensure_active(&self.cancel)?;
        let mut state = self.state.lock().await;
        if let Some(tx) = state.transaction.as_mut() {
            return read.run(tx.as_mut()).await;
        }
        drop(state);

        let mut tx = self.store.begin(&self.cancel).await?;
        match read.run(tx.as_mut()).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                discard(tx.as_mut()).await;
                Err(e)
            }
        }
    }

    pub(crate) async fn stage(&self, change: Change) -> AppResult<()> {
        ensure_active(&self.cancel)?;
        self.state.lock().await.pending.push(change);
        Ok(())
    }

    /// Number of staged, unsaved changes.
    pub async fn pending_changes(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Whether an explicit transaction is open.
    pub async fn in_transaction(&self) -> bool {
        self.state.lock().await.transaction.is_some()
    }

    /// Apply every staged change and return the number of affected rows.
    pub(crate) async fn save_changes(&self) -> AppResult<u64> {
        ensure_active(&self.cancel)?;
        let mut state = self.state.lock().await;
        let changes = mem::take(&mut state.pending);
        if changes.is_empty() {
            return Ok(0);
        }

        if let Some(tx) = state.transaction.as_mut() {
            return match apply(tx.as_mut(), changes).await {
                Ok(applied) => {
                    let (affected, slots) = applied.fill();
                    state.provisional.extend(slots);
                    Ok(affected)
                }
                Err(e) => {
                    state.doomed = true;
                    Err(e)
                }
            };
        }
        drop(state);

        let mut tx = self.store.begin(&self.cancel).await?;
        let applied = match apply(tx.as_mut(), changes).await {
            Ok(applied) => applied,
            Err(e) => {
                discard(tx.as_mut()).await;
                return Err(e);
            }
        };
        if let Err(e) = tx.commit().await {
            discard(tx.as_mut()).await;
            return Err(e);
        }
        Ok(applied.fill().0)
    }

    pub(crate) async fn begin_transaction(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.transaction.is_some() {
            return Err(AppError::transaction("a transaction is already active"));
        }
        state.transaction = Some(self.store.begin(&self.cancel).await?);
        state.doomed = false;
        state.provisional.clear();
        debug!(store = self.store.name(), "Transaction started");
        Ok(())
    }

    /// Flush staged changes into the explicit transaction and commit it.
    ///
    /// Leaves the transaction in place on failure so that the caller can
    /// roll it back. Without an open transaction the staged changes are
    /// kept.
    pub(crate) async fn commit_transaction(&self) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        if state.transaction.is_none() {
            return Err(AppError::transaction("no active transaction"));
        }
        if state.doomed {
            return Err(AppError::transaction(
                "transaction cannot commit after a failed save",
            ));
        }
        let changes = mem::take(&mut state.pending);
        let tx = state
            .transaction
            .as_mut()
            .ok_or_else(|| AppError::transaction("no active transaction"))?;
        let applied = apply(tx.as_mut(), changes).await?;
        tx.commit().await?;
        state.transaction = None;
        state.provisional.clear();
        Ok(applied.fill().0)
    }

    /// Discard staged changes and roll back the explicit transaction.
    ///
    /// Identities and versions handed out by saves inside the transaction
    /// are withdrawn.
    pub(crate) async fn rollback_transaction(&self) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.pending.clear();
        state.doomed = false;
        for slot in mem::take(&mut state.provisional) {
            slot.clear();
        }
        match state.transaction.take() {
            Some(mut tx) => tx.rollback().await,
            None => Ok(()),
        }
    }
}

/// Rows written by one save, plus the handles to fill afterwards.
struct Applied {
    affected: u64,
    keys: Vec<(KeySlot, EntityId, i64)>,
}

impl Applied {
    /// Fill every handle; returns the affected-row count and the handles.
    fn fill(self) -> (u64, Vec<KeySlot>) {
        let mut slots = Vec::with_capacity(self.keys.len());
        for (slot, id, version) in self.keys {
            slot.fill(id, version);
            slots.push(slot);
        }
        (self.affected, slots)
    }
}

async fn apply(tx: &mut dyn StoreTransaction, changes: Vec<Change>) -> AppResult<Applied> {
    let mut applied = Applied {
        affected: 0,
        keys: Vec::new(),
    };
    for change in changes {
        match change {
            Change::Insert {
                table,
                payload,
                slot,
            } => {
                let row = tx.insert(table, payload).await?;
                applied.keys.push((slot, row.id, row.version));
                applied.affected += 1;
            }
            Change::Update {
                table,
                id,
                expected_version,
                payload,
                slot,
            } => {
                let row = tx.update(table, id, expected_version, payload).await?;
                applied.keys.push((slot, row.id, row.version));
                applied.affected += 1;
            }
            Change::Delete {
                table,
                id,
                required,
            } => {
                if tx.delete(table, id).await? {
                    applied.affected += 1;
                } else if required {
                    return Err(missing_row(table, id));
                }
            }
        }
    }
    Ok(applied)
}

async fn discard(tx: &mut dyn StoreTransaction) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Rollback after failed operation also failed");
    }
}
