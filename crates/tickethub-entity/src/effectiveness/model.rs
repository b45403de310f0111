//! Effectiveness entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, EntityMeta, Relation};

use crate::tables;
use crate::validation::{non_negative_measure, optional_text, reference, required_text};

/// A before/after measurement of a countermeasure taken for an incident.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Effectiveness {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Incident the countermeasure addresses.
    pub incident_id: EntityId,
    /// What was measured, e.g. `"damaged units per week"`.
    pub measure: String,
    /// Value before the countermeasure.
    pub before_value: f64,
    /// Value after the countermeasure.
    pub after_value: f64,
    /// When the after-value was taken.
    pub measured_at: DateTime<Utc>,
    /// User who evaluated the result.
    pub evaluated_by: EntityId,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl_entity!(
    Effectiveness,
    tables::EFFECTIVENESS,
    [
        Relation::belongs_to("incident", tables::INCIDENTS, "incident_id"),
        Relation::belongs_to("evaluator", tables::USERS, "evaluated_by"),
    ]
);

/// Data required to record a measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEffectiveness {
    /// Incident the countermeasure addresses.
    pub incident_id: EntityId,
    /// What was measured.
    pub measure: String,
    /// Value before the countermeasure.
    pub before_value: f64,
    /// Value after the countermeasure.
    pub after_value: f64,
    /// When the after-value was taken.
    pub measured_at: DateTime<Utc>,
    /// Evaluating user.
    pub evaluated_by: EntityId,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl Effectiveness {
    /// Create a measurement, enforcing construction invariants.
    pub fn new(data: NewEffectiveness) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            incident_id: reference("incident_id", data.incident_id)?,
            measure: required_text("measure", &data.measure)?,
            before_value: non_negative_measure("before_value", data.before_value)?,
            after_value: non_negative_measure("after_value", data.after_value)?,
            measured_at: data.measured_at,
            evaluated_by: reference("evaluated_by", data.evaluated_by)?,
            notes: optional_text(data.notes.as_deref()),
        })
    }

    /// Record a new after-value.
    pub fn remeasure(&mut self, after_value: f64, at: DateTime<Utc>) -> AppResult<()> {
        self.after_value = non_negative_measure("after_value", after_value)?;
        self.measured_at = at;
        self.meta.touch();
        Ok(())
    }

    /// Relative reduction in percent; `0` when the before-value is zero.
    pub fn improvement_rate(&self) -> f64 {
        if self.before_value <= 0.0 {
            return 0.0;
        }
        (self.before_value - self.after_value) / self.before_value * 100.0
    }
}
