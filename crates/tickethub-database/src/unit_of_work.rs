//! The unit of work: repository registry and commit boundary.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tickethub_core::config::PaginationConfig;
use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::Entity;
use tickethub_entity::{
    AuditLog, Attachment, DamageType, Effectiveness, Incident, ShippingCompany, TroubleType, User,
    Warehouse,
};

use crate::repository::EntityRepository;
use crate::session::Session;
use crate::store::Store;

type Registry = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Groups repository writes into atomic saves and optional explicit
/// transactions.
///
/// Repositories are created on first access and cached, so repeated calls
/// for the same entity type return the same instance. Writes staged through
/// any repository are applied, in call order, by [`save_changes`] or
/// [`commit_transaction`].
///
/// A unit of work is meant for one logical operation at a time. Independent
/// concurrent reads should use separate units of work.
///
/// [`save_changes`]: UnitOfWork::save_changes
/// [`commit_transaction`]: UnitOfWork::commit_transaction
pub struct UnitOfWork {
    session: Arc<Session>,
    repositories: Mutex<Registry>,
}

impl UnitOfWork {
    /// A unit of work over `store` with default paging limits.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_options(store, CancellationToken::new(), &PaginationConfig::default())
    }

    /// A unit of work whose store calls observe `cancel`.
    pub fn with_options(
        store: Arc<dyn Store>,
        cancel: CancellationToken,
        pagination: &PaginationConfig,
    ) -> Self {
        Self {
            session: Arc::new(Session::new(store, cancel, pagination.max_page_size)),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The repository for `T`, created on first use.
    pub fn repository<T: Entity>(&self) -> Arc<EntityRepository<T>> {
        let mut registry = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = registry.entry(TypeId::of::<T>()).or_insert_with(|| {
            Arc::new(EntityRepository::<T>::new(Arc::clone(&self.session)))
                as Arc<dyn Any + Send + Sync>
        });
        match Arc::clone(slot).downcast::<EntityRepository<T>>() {
            Ok(repository) => repository,
            Err(_) => {
                let repository = Arc::new(EntityRepository::<T>::new(Arc::clone(&self.session)));
                *slot = Arc::clone(&repository) as Arc<dyn Any + Send + Sync>;
                repository
            }
        }
    }

    /// Users.
    pub fn users(&self) -> Arc<EntityRepository<User>> {
        self.repository()
    }

    /// Warehouses.
    pub fn warehouses(&self) -> Arc<EntityRepository<Warehouse>> {
        self.repository()
    }

    /// Shipping companies.
    pub fn shipping_companies(&self) -> Arc<EntityRepository<ShippingCompany>> {
        self.repository()
    }

    /// Trouble types.
    pub fn trouble_types(&self) -> Arc<EntityRepository<TroubleType>> {
        self.repository()
    }

    /// Damage types.
    pub fn damage_types(&self) -> Arc<EntityRepository<DamageType>> {
        self.repository()
    }

    /// Incidents.
    pub fn incidents(&self) -> Arc<EntityRepository<Incident>> {
        self.repository()
    }

    /// Incident attachments.
    pub fn attachments(&self) -> Arc<EntityRepository<Attachment>> {
        self.repository()
    }

    /// Effectiveness measurements.
    pub fn effectiveness(&self) -> Arc<EntityRepository<Effectiveness>> {
        self.repository()
    }

    /// Audit trail.
    pub fn audit_logs(&self) -> Arc<EntityRepository<AuditLog>> {
        self.repository()
    }

    /// Apply every staged change atomically and return the affected row count.
    ///
    /// Outside an explicit transaction the changes are committed by a
    /// transaction of their own. Inside one they become durable only when
    /// [`commit_transaction`](Self::commit_transaction) succeeds; a failed
    /// save inside a transaction leaves it fit only for rollback.
    pub async fn save_changes(&self) -> AppResult<u64> {
        let affected = self.session.save_changes().await?;
        if affected > 0 {
            info!(affected, "Changes saved");
        }
        Ok(affected)
    }

    /// Open an explicit transaction. Fails if one is already active.
    pub async fn begin_transaction(&self) -> AppResult<()> {
        self.session.begin_transaction().await
    }

    /// Save outstanding changes and commit the explicit transaction.
    ///
    /// On any failure the transaction is rolled back and the original error
    /// is returned. Without an active transaction nothing is rolled back and
    /// staged changes stay queued.
    pub async fn commit_transaction(&self) -> AppResult<()> {
        if !self.session.in_transaction().await {
            return Err(AppError::transaction("no active transaction"));
        }
        match self.session.commit_transaction().await {
            Ok(affected) => {
                info!(affected, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Commit failed, rolling back");
                self.rollback_transaction().await;
                Err(e)
            }
        }
    }

    /// Discard staged changes and roll back the explicit transaction.
    ///
    /// A no-op without an active transaction. Rollback failures are logged
    /// and not returned.
    pub async fn rollback_transaction(&self) {
        if let Err(e) = self.session.rollback_transaction().await {
            warn!(error = %e, "Rollback failed");
        }
    }

    /// Whether an explicit transaction is open.
    pub async fn in_transaction(&self) -> bool {
        self.session.in_transaction().await
    }

    /// Number of staged, unsaved changes.
    pub async fn pending_changes(&self) -> usize {
        self.session.pending_changes().await
    }

    /// Largest page size search criteria may request.
    pub fn max_page_size(&self) -> u64 {
        self.session.max_page_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_repositories_are_cached_per_type() {
        let uow = UnitOfWork::new(Arc::new(MemoryStore::new()));
        let first = uow.incidents();
        let second = uow.repository::<Incident>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(uow.repositories.lock().expect("lock").len(), 1);

        let _ = uow.users();
        assert_eq!(uow.repositories.lock().expect("lock").len(), 2);
    }
}
