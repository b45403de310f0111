//! Batch resolution of master-data display names.
//!
//! A page of incidents references users, warehouses, carriers, and
//! classification types by id. [`MasterDataResolver`] collects the distinct
//! ids per table and fetches the five tables concurrently, one read each,
//! then joins the results before returning.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId};
use tickethub_database::{EntityRepository, UnitOfWork};
use tickethub_entity::master::Named;
use tickethub_entity::{Incident, IncidentPriority, IncidentStatus};

/// Display names by id, one map per referenced table.
#[derive(Debug, Clone, Default)]
pub struct MasterNames {
    /// Users.
    pub users: HashMap<EntityId, String>,
    /// Warehouses.
    pub warehouses: HashMap<EntityId, String>,
    /// Shipping companies.
    pub shipping_companies: HashMap<EntityId, String>,
    /// Trouble types.
    pub trouble_types: HashMap<EntityId, String>,
    /// Damage types.
    pub damage_types: HashMap<EntityId, String>,
}

fn label(names: &HashMap<EntityId, String>, id: EntityId) -> String {
    names.get(&id).cloned().unwrap_or_else(|| format!("#{id}"))
}

/// An incident with its foreign keys replaced by display names.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentView {
    /// Identity.
    pub id: EntityId,
    /// Short summary.
    pub title: String,
    /// Workflow state.
    pub status: IncidentStatus,
    /// Urgency.
    pub priority: IncidentPriority,
    /// Warehouse name.
    pub warehouse: String,
    /// Carrier name.
    pub shipping_company: String,
    /// Trouble type name.
    pub trouble_type: String,
    /// Damage type name, if classified.
    pub damage_type: Option<String>,
    /// Reporter display name.
    pub reporter: String,
    /// Assignee display name, if assigned.
    pub assignee: Option<String>,
    /// When the incident happened.
    pub occurred_at: DateTime<Utc>,
}

impl MasterNames {
    /// Project an incident through the resolved names. Dangling ids render
    /// as `#id`.
    pub fn view(&self, incident: &Incident) -> IncidentView {
        IncidentView {
            id: incident.id(),
            title: incident.title.clone(),
            status: incident.status,
            priority: incident.priority,
            warehouse: label(&self.warehouses, incident.warehouse_id),
            shipping_company: label(&self.shipping_companies, incident.shipping_company_id),
            trouble_type: label(&self.trouble_types, incident.trouble_type_id),
            damage_type: incident
                .damage_type_id
                .map(|id| label(&self.damage_types, id)),
            reporter: label(&self.users, incident.reporter_id),
            assignee: incident.assignee_id.map(|id| label(&self.users, id)),
            occurred_at: incident.occurred_at,
        }
    }
}

/// Resolves display names for pages of incidents.
pub struct MasterDataResolver {
    uow: Arc<UnitOfWork>,
}

impl MasterDataResolver {
    /// Create a resolver reading through `uow`.
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Fetch every name the incidents reference.
    pub async fn resolve(&self, incidents: &[Incident]) -> AppResult<MasterNames> {
        let users = distinct(
            incidents
                .iter()
                .flat_map(|i| std::iter::once(i.reporter_id).chain(i.assignee_id)),
        );
        let warehouses = distinct(incidents.iter().map(|i| i.warehouse_id));
        let companies = distinct(incidents.iter().map(|i| i.shipping_company_id));
        let trouble_types = distinct(incidents.iter().map(|i| i.trouble_type_id));
        let damage_types = distinct(incidents.iter().filter_map(|i| i.damage_type_id));

        let (users, warehouses, shipping_companies, trouble_types, damage_types) = futures::try_join!(
            names(self.uow.users(), users),
            names(self.uow.warehouses(), warehouses),
            names(self.uow.shipping_companies(), companies),
            names(self.uow.trouble_types(), trouble_types),
            names(self.uow.damage_types(), damage_types),
        )?;

        Ok(MasterNames {
            users,
            warehouses,
            shipping_companies,
            trouble_types,
            damage_types,
        })
    }

    /// Resolve names and project every incident.
    pub async fn views(&self, incidents: &[Incident]) -> AppResult<Vec<IncidentView>> {
        let names = self.resolve(incidents).await?;
        Ok(incidents.iter().map(|i| names.view(i)).collect())
    }
}

fn distinct(ids: impl Iterator<Item = EntityId>) -> Vec<EntityId> {
    ids.collect::<BTreeSet<_>>().into_iter().collect()
}

async fn names<T: Named>(
    repository: Arc<EntityRepository<T>>,
    ids: Vec<EntityId>,
) -> AppResult<HashMap<EntityId, String>> {
    let rows = repository.get_many(&ids).await?;
    debug!(table = T::TABLE, requested = ids.len(), found = rows.len(), "Names resolved");
    Ok(rows
        .into_iter()
        .map(|row| (row.id(), row.label().to_string()))
        .collect())
}
