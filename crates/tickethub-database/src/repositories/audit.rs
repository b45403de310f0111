//! Audit trail queries.

use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_entity::AuditLog;

use crate::repository::EntityRepository;

/// Repository for audit records.
pub type AuditLogRepository = EntityRepository<AuditLog>;

impl EntityRepository<AuditLog> {
    /// Audit records about one entity, oldest first.
    pub async fn find_for_entity<T: Entity>(&self, entity_id: EntityId) -> AppResult<Vec<AuditLog>> {
        let filter = Filter::new()
            .and(|a: &AuditLog| a.entity_type == T::TABLE)
            .eq(Some(entity_id), |a: &AuditLog| a.entity_id);
        self.find(&filter).await
    }

    /// Audit records written by one user.
    pub async fn find_by_actor(&self, actor_id: EntityId) -> AppResult<Vec<AuditLog>> {
        self.find(&Filter::new().eq(Some(actor_id), |a: &AuditLog| a.actor_id))
            .await
    }
}
