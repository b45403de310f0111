//! Incident search criteria and queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, Repository};
use tickethub_core::types::filter::{Filter, contains_ci, normalize_needle};
use tickethub_core::types::sorting::{SortKey, SortValue};
use tickethub_entity::{Incident, IncidentPriority, IncidentStatus};

use crate::criteria::{Paging, SearchCriteria};
use crate::repository::EntityRepository;

/// Repository for incidents.
pub type IncidentRepository = EntityRepository<Incident>;

/// Fields incidents can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentSortKey {
    /// When the incident happened (default).
    OccurredAt,
    /// When it was reported.
    ReportedAt,
    /// When the record was created.
    CreatedAt,
    /// When the record last changed.
    UpdatedAt,
    /// When it was resolved; unresolved incidents sort first.
    ResolvedAt,
    /// Title, case-insensitive.
    Title,
    /// Workflow position.
    Status,
    /// Urgency rank.
    Priority,
    /// Number of damaged units.
    DamagedQuantity,
    /// Identity.
    Id,
}

impl SortKey<Incident> for IncidentSortKey {
    const DEFAULT: Self = Self::OccurredAt;
    const ALL: &'static [Self] = &[
        Self::OccurredAt,
        Self::ReportedAt,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::ResolvedAt,
        Self::Title,
        Self::Status,
        Self::Priority,
        Self::DamagedQuantity,
        Self::Id,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::OccurredAt => "occurred_at",
            Self::ReportedAt => "reported_at",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::ResolvedAt => "resolved_at",
            Self::Title => "title",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::DamagedQuantity => "damaged_quantity",
            Self::Id => "id",
        }
    }

    fn value(self, incident: &Incident) -> SortValue {
        match self {
            Self::OccurredAt => incident.occurred_at.into(),
            Self::ReportedAt => incident.reported_at.into(),
            Self::CreatedAt => incident.meta.created_at.into(),
            Self::UpdatedAt => incident.meta.updated_at.into(),
            Self::ResolvedAt => incident.resolved_at.into(),
            Self::Title => SortValue::text(&incident.title),
            Self::Status => SortValue::Int(incident.status as i64),
            Self::Priority => incident.priority.rank().into(),
            Self::DamagedQuantity => incident.damaged_quantity.into(),
            Self::Id => incident.meta.id.into(),
        }
    }
}

/// Incident search criteria. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentSearch {
    /// Substring of the title, description, or tracking number.
    #[serde(default)]
    pub keyword: Option<String>,
    /// Exact status.
    #[serde(default)]
    pub status: Option<IncidentStatus>,
    /// Exact priority.
    #[serde(default)]
    pub priority: Option<IncidentPriority>,
    /// Warehouse.
    #[serde(default)]
    pub warehouse_id: Option<EntityId>,
    /// Carrier.
    #[serde(default)]
    pub shipping_company_id: Option<EntityId>,
    /// Trouble classification.
    #[serde(default)]
    pub trouble_type_id: Option<EntityId>,
    /// Damage classification.
    #[serde(default)]
    pub damage_type_id: Option<EntityId>,
    /// Reporting user.
    #[serde(default)]
    pub reporter_id: Option<EntityId>,
    /// Assigned user.
    #[serde(default)]
    pub assignee_id: Option<EntityId>,
    /// Substring of the tracking number.
    #[serde(default)]
    pub tracking_number: Option<String>,
    /// Earliest occurrence time, inclusive.
    #[serde(default)]
    pub occurred_from: Option<DateTime<Utc>>,
    /// Latest occurrence time, inclusive.
    #[serde(default)]
    pub occurred_to: Option<DateTime<Utc>>,
    /// Earliest report time, inclusive.
    #[serde(default)]
    pub reported_from: Option<DateTime<Utc>>,
    /// Latest report time, inclusive.
    #[serde(default)]
    pub reported_to: Option<DateTime<Utc>>,
    /// Smallest damaged quantity, inclusive.
    #[serde(default)]
    pub min_damaged_quantity: Option<i64>,
    /// Largest damaged quantity, inclusive.
    #[serde(default)]
    pub max_damaged_quantity: Option<i64>,
    /// Ordering and paging.
    #[serde(flatten)]
    pub paging: Paging,
}

impl SearchCriteria<Incident> for IncidentSearch {
    type SortKey = IncidentSortKey;

    fn filter(&self) -> Filter<Incident> {
        Filter::new()
            .when(
                normalize_needle(self.keyword.as_deref()),
                |i: &Incident, needle: &String| {
                    contains_ci(&i.title, needle)
                        || contains_ci(&i.description, needle)
                        || i.tracking_number
                            .as_deref()
                            .is_some_and(|t| contains_ci(t, needle))
                },
            )
            .eq(self.status, |i: &Incident| i.status)
            .eq(self.priority, |i: &Incident| i.priority)
            .eq(self.warehouse_id, |i: &Incident| i.warehouse_id)
            .eq(self.shipping_company_id, |i: &Incident| i.shipping_company_id)
            .eq(self.trouble_type_id, |i: &Incident| i.trouble_type_id)
            .eq_opt(self.damage_type_id, |i: &Incident| i.damage_type_id)
            .eq(self.reporter_id, |i: &Incident| i.reporter_id)
            .eq_opt(self.assignee_id, |i: &Incident| i.assignee_id)
            .contains(self.tracking_number.as_deref(), |i: &Incident| {
                i.tracking_number.as_deref().unwrap_or_default()
            })
            .range(self.occurred_from, self.occurred_to, |i: &Incident| {
                i.occurred_at
            })
            .range(self.reported_from, self.reported_to, |i: &Incident| {
                i.reported_at
            })
            .range(
                self.min_damaged_quantity,
                self.max_damaged_quantity,
                |i: &Incident| i.damaged_quantity,
            )
    }

    fn paging(&self) -> &Paging {
        &self.paging
    }
}

impl EntityRepository<Incident> {
    /// Incidents in the given status.
    pub async fn find_by_status(&self, status: IncidentStatus) -> AppResult<Vec<Incident>> {
        self.find(&Filter::new().eq(Some(status), |i: &Incident| i.status))
            .await
    }

    /// Incidents that occurred at a warehouse.
    pub async fn find_by_warehouse(&self, warehouse_id: EntityId) -> AppResult<Vec<Incident>> {
        self.find(&Filter::new().eq(Some(warehouse_id), |i: &Incident| i.warehouse_id))
            .await
    }

    /// Incidents assigned to a user.
    pub async fn find_by_assignee(&self, assignee_id: EntityId) -> AppResult<Vec<Incident>> {
        self.find(&Filter::new().eq_opt(Some(assignee_id), |i: &Incident| i.assignee_id))
            .await
    }

    /// Unresolved incidents reported before `cutoff`.
    pub async fn find_open_older_than(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<Incident>> {
        let filter = Filter::new()
            .and(|i: &Incident| !i.status.is_resolved_or_closed())
            .and(move |i: &Incident| i.reported_at < cutoff);
        self.find(&filter).await
    }
}
