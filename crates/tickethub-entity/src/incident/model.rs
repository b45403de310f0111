//! Incident entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, EntityMeta, Relation};

use super::status::{IncidentPriority, IncidentStatus};
use crate::tables;
use crate::validation::{non_negative, optional_text, reference, required_text};

/// A logistics trouble report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Short summary.
    pub title: String,
    /// What happened.
    pub description: String,
    /// Workflow state.
    pub status: IncidentStatus,
    /// Urgency.
    pub priority: IncidentPriority,
    /// Warehouse where the incident occurred.
    pub warehouse_id: EntityId,
    /// Carrier responsible for the shipment.
    pub shipping_company_id: EntityId,
    /// Trouble classification.
    pub trouble_type_id: EntityId,
    /// Damage classification, when goods were damaged.
    pub damage_type_id: Option<EntityId>,
    /// User who filed the report.
    pub reporter_id: EntityId,
    /// User currently handling the incident.
    pub assignee_id: Option<EntityId>,
    /// Carrier tracking number.
    pub tracking_number: Option<String>,
    /// Number of damaged or missing units.
    pub damaged_quantity: i64,
    /// When the incident happened.
    pub occurred_at: DateTime<Utc>,
    /// When the incident was reported.
    pub reported_at: DateTime<Utc>,
    /// When a resolution was recorded.
    pub resolved_at: Option<DateTime<Utc>>,
    /// How the incident was resolved.
    pub resolution: Option<String>,
}

impl_entity!(
    Incident,
    tables::INCIDENTS,
    [
        Relation::belongs_to("reporter", tables::USERS, "reporter_id"),
        Relation::belongs_to("assignee", tables::USERS, "assignee_id"),
        Relation::belongs_to("warehouse", tables::WAREHOUSES, "warehouse_id"),
        Relation::belongs_to(
            "shipping_company",
            tables::SHIPPING_COMPANIES,
            "shipping_company_id"
        ),
        Relation::belongs_to("trouble_type", tables::TROUBLE_TYPES, "trouble_type_id"),
        Relation::belongs_to("damage_type", tables::DAMAGE_TYPES, "damage_type_id"),
        Relation::has_many("attachments", tables::ATTACHMENTS, "incident_id"),
        Relation::has_many("effectiveness", tables::EFFECTIVENESS, "incident_id"),
    ]
);

/// Data required to report a new incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
    /// Short summary.
    pub title: String,
    /// What happened.
    pub description: String,
    /// Urgency.
    pub priority: IncidentPriority,
    /// Warehouse where the incident occurred.
    pub warehouse_id: EntityId,
    /// Carrier responsible for the shipment.
    pub shipping_company_id: EntityId,
    /// Trouble classification.
    pub trouble_type_id: EntityId,
    /// Damage classification.
    pub damage_type_id: Option<EntityId>,
    /// Reporting user.
    pub reporter_id: EntityId,
    /// Carrier tracking number.
    pub tracking_number: Option<String>,
    /// Number of damaged or missing units.
    pub damaged_quantity: i64,
    /// When the incident happened.
    pub occurred_at: DateTime<Utc>,
    /// When it was reported; defaults to now.
    pub reported_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Create an open incident, enforcing construction invariants.
    pub fn new(data: NewIncident) -> AppResult<Self> {
        let reported_at = data.reported_at.unwrap_or_else(Utc::now);
        if data.occurred_at > reported_at {
            return Err(AppError::validation(
                "occurred_at must not be later than reported_at",
            ));
        }
        if let Some(damage_type_id) = data.damage_type_id {
            reference("damage_type_id", damage_type_id)?;
        }

        Ok(Self {
            meta: EntityMeta::new(),
            title: required_text("title", &data.title)?,
            description: required_text("description", &data.description)?,
            status: IncidentStatus::Open,
            priority: data.priority,
            warehouse_id: reference("warehouse_id", data.warehouse_id)?,
            shipping_company_id: reference("shipping_company_id", data.shipping_company_id)?,
            trouble_type_id: reference("trouble_type_id", data.trouble_type_id)?,
            damage_type_id: data.damage_type_id,
            reporter_id: reference("reporter_id", data.reporter_id)?,
            assignee_id: None,
            tracking_number: optional_text(data.tracking_number.as_deref()),
            damaged_quantity: non_negative("damaged_quantity", data.damaged_quantity)?,
            occurred_at: data.occurred_at,
            reported_at,
            resolved_at: None,
            resolution: None,
        })
    }

    /// Change the summary, description, and priority.
    pub fn edit(
        &mut self,
        title: &str,
        description: &str,
        priority: IncidentPriority,
    ) -> AppResult<()> {
        self.title = required_text("title", title)?;
        self.description = required_text("description", description)?;
        self.priority = priority;
        self.meta.touch();
        Ok(())
    }

    /// Hand the incident to a user.
    pub fn assign(&mut self, assignee_id: EntityId) -> AppResult<()> {
        if self.status == IncidentStatus::Closed {
            return Err(AppError::validation("a closed incident cannot be assigned"));
        }
        self.assignee_id = Some(reference("assignee_id", assignee_id)?);
        self.meta.touch();
        Ok(())
    }

    /// Begin investigating an open incident.
    pub fn start(&mut self) -> AppResult<()> {
        self.transition(&[IncidentStatus::Open], IncidentStatus::InProgress)?;
        self.meta.touch();
        Ok(())
    }

    /// Record a resolution now.
    pub fn resolve(&mut self, resolution: &str) -> AppResult<()> {
        self.resolve_at(resolution, Utc::now())
    }

    /// Record a resolution at a specific time.
    pub fn resolve_at(&mut self, resolution: &str, at: DateTime<Utc>) -> AppResult<()> {
        if at < self.reported_at {
            return Err(AppError::validation(
                "resolved_at must not be earlier than reported_at",
            ));
        }
        let resolution = required_text("resolution", resolution)?;
        self.transition(
            &[IncidentStatus::Open, IncidentStatus::InProgress],
            IncidentStatus::Resolved,
        )?;
        self.resolution = Some(resolution);
        self.resolved_at = Some(at);
        self.meta.touch();
        Ok(())
    }

    /// Confirm a resolved incident.
    pub fn close(&mut self) -> AppResult<()> {
        self.transition(&[IncidentStatus::Resolved], IncidentStatus::Closed)?;
        self.meta.touch();
        Ok(())
    }

    /// Send a resolved or closed incident back to the queue.
    pub fn reopen(&mut self) -> AppResult<()> {
        self.transition(
            &[IncidentStatus::Resolved, IncidentStatus::Closed],
            IncidentStatus::Open,
        )?;
        self.resolution = None;
        self.resolved_at = None;
        self.meta.touch();
        Ok(())
    }

    /// Time from report to resolution, for resolved or closed incidents.
    ///
    /// Falls back to `updated_at` when no resolution time was recorded.
    pub fn resolution_time(&self) -> Option<Duration> {
        if !self.status.is_resolved_or_closed() {
            return None;
        }
        let end = self.resolved_at.unwrap_or(self.meta.updated_at);
        Some(end - self.reported_at)
    }

    fn transition(&mut self, from: &[IncidentStatus], to: IncidentStatus) -> AppResult<()> {
        if !from.contains(&self.status) {
            return Err(AppError::validation(format!(
                "cannot move incident from {} to {}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickethub_core::error::ErrorKind;
    use tickethub_core::traits::Entity;

    fn new_incident() -> NewIncident {
        let reported = Utc::now() - Duration::hours(5);
        NewIncident {
            title: "Crushed pallet".into(),
            description: "Forklift damage at dock 3".into(),
            priority: IncidentPriority::High,
            warehouse_id: 1,
            shipping_company_id: 2,
            trouble_type_id: 3,
            damage_type_id: Some(4),
            reporter_id: 5,
            tracking_number: Some("  ".into()),
            damaged_quantity: 12,
            occurred_at: reported - Duration::hours(1),
            reported_at: Some(reported),
        }
    }

    #[test]
    fn test_new_incident_is_open() {
        let incident = Incident::new(new_incident()).expect("valid");
        assert_eq!(incident.status, IncidentStatus::Open);
        assert!(incident.tracking_number.is_none());
        assert!(incident.meta.updated_at >= incident.meta.created_at);
    }

    #[test]
    fn test_factory_rejects_negative_quantity() {
        let mut data = new_incident();
        data.damaged_quantity = -1;
        let err = Incident::new(data).expect_err("invalid");
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_factory_rejects_occurrence_after_report() {
        let mut data = new_incident();
        data.occurred_at = Utc::now() + Duration::hours(1);
        assert!(Incident::new(data).is_err());
    }

    #[test]
    fn test_resolution_lifecycle() {
        let mut incident = Incident::new(new_incident()).expect("valid");
        let before = incident.meta.updated_at;
        incident.start().expect("start");
        let resolved_at = incident.reported_at + Duration::hours(3);
        incident.resolve_at("Replaced goods", resolved_at).expect("resolve");
        assert_eq!(incident.resolution_time(), Some(Duration::hours(3)));
        assert!(incident.meta.updated_at >= before);

        incident.close().expect("close");
        assert!(incident.start().is_err());
        incident.reopen().expect("reopen");
        assert!(incident.resolved_at.is_none());
        assert_eq!(incident.resolution_time(), None);
    }

    #[test]
    fn test_relations_are_declared() {
        assert!(Incident::relation("warehouse").is_some());
        assert!(Incident::relation("attachments").is_some());
        assert!(Incident::relation("invoices").is_none());
    }
}
