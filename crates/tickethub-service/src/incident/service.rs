//! Incident workflows that keep the audit trail in step with the data.

use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::info;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, Repository};
use tickethub_core::types::pagination::PagedResult;
use tickethub_database::UnitOfWork;
use tickethub_database::repositories::IncidentSearch;
use tickethub_entity::{AuditLog, Incident, NewIncident, User};

use crate::resolver::{IncidentView, MasterDataResolver};

/// Reports, resolves, and lists incidents.
pub struct IncidentService {
    uow: Arc<UnitOfWork>,
    resolver: MasterDataResolver,
}

impl IncidentService {
    /// Create an incident service over `uow`.
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self {
            resolver: MasterDataResolver::new(Arc::clone(&uow)),
            uow,
        }
    }

    /// File a new incident and its audit record in one transaction.
    pub async fn report(&self, actor_id: EntityId, data: NewIncident) -> AppResult<Incident> {
        let incident = Incident::new(data)?;
        self.require_user(actor_id).await?;

        let saved = self
            .in_transaction(async move {
                let pending = self.uow.incidents().add(incident).await?;
                self.uow.save_changes().await?;
                let saved = pending
                    .saved()
                    .ok_or_else(|| AppError::internal("incident identity was not assigned"))?;
                let details = json!({ "title": saved.title, "priority": saved.priority });
                self.uow
                    .audit_logs()
                    .add(AuditLog::record(actor_id, "incident.report", &saved, Some(details))?)
                    .await?;
                Ok(saved)
            })
            .await?;

        info!(incident_id = saved.id(), actor_id, "Incident reported");
        Ok(saved)
    }

    /// Record a resolution. Only users whose role may resolve can do this.
    pub async fn resolve(
        &self,
        actor_id: EntityId,
        incident_id: EntityId,
        resolution: &str,
    ) -> AppResult<Incident> {
        let actor = self.require_user(actor_id).await?;
        if !actor.role.can_resolve() {
            return Err(AppError::validation(format!(
                "user '{}' may not resolve incidents",
                actor.username
            )));
        }

        let resolved = self
            .in_transaction(async move {
                let repo = self.uow.incidents();
                let mut incident = repo
                    .get_by_id(incident_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("incident {incident_id} not found")))?;
                incident.resolve(resolution)?;
                let staged = repo.update(incident).await?;
                self.uow
                    .audit_logs()
                    .add(AuditLog::record(
                        actor_id,
                        "incident.resolve",
                        staged.entity(),
                        Some(json!({ "resolution": resolution })),
                    )?)
                    .await?;
                Ok(staged)
            })
            .await?
            .saved()
            .ok_or_else(|| AppError::internal("resolved incident was not written"))?;

        info!(incident_id, actor_id, "Incident resolved");
        Ok(resolved)
    }

    /// One page of incidents with display names resolved.
    pub async fn list(&self, search: &IncidentSearch) -> AppResult<PagedResult<IncidentView>> {
        let page = self.uow.incidents().search(search).await?;
        let names = self.resolver.resolve(&page.items).await?;
        Ok(page.map(|incident| names.view(&incident)))
    }

    async fn require_user(&self, id: EntityId) -> AppResult<User> {
        self.uow
            .users()
            .get_by_id(id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| AppError::not_found(format!("active user {id} not found")))
    }

    /// Run `work` inside an explicit transaction, committing on success and
    /// rolling back on failure.
    async fn in_transaction<R>(&self, work: impl Future<Output = AppResult<R>>) -> AppResult<R> {
        self.uow.begin_transaction().await?;
        match work.await {
            Ok(value) => {
                self.uow.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                self.uow.rollback_transaction().await;
                Err(e)
            }
        }
    }
}
