//! Effectiveness measurement search criteria and queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{EntityId, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_core::types::sorting::{SortKey, SortValue};
use tickethub_entity::Effectiveness;

use crate::criteria::{Paging, SearchCriteria};
use crate::repository::EntityRepository;

/// Repository for effectiveness measurements.
pub type EffectivenessRepository = EntityRepository<Effectiveness>;

/// Fields measurements can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivenessSortKey {
    /// Measurement time (default).
    MeasuredAt,
    /// Countermeasure name.
    Measure,
    /// Value before the countermeasure.
    BeforeValue,
    /// Value after the countermeasure.
    AfterValue,
    /// Relative improvement.
    ImprovementRate,
}

impl SortKey<Effectiveness> for EffectivenessSortKey {
    const DEFAULT: Self = Self::MeasuredAt;
    const ALL: &'static [Self] = &[
        Self::MeasuredAt,
        Self::Measure,
        Self::BeforeValue,
        Self::AfterValue,
        Self::ImprovementRate,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::MeasuredAt => "measured_at",
            Self::Measure => "measure",
            Self::BeforeValue => "before_value",
            Self::AfterValue => "after_value",
            Self::ImprovementRate => "improvement_rate",
        }
    }

    fn value(self, row: &Effectiveness) -> SortValue {
        match self {
            Self::MeasuredAt => row.measured_at.into(),
            Self::Measure => SortValue::text(&row.measure),
            Self::BeforeValue => row.before_value.into(),
            Self::AfterValue => row.after_value.into(),
            Self::ImprovementRate => row.improvement_rate().into(),
        }
    }
}

/// Effectiveness search criteria.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectivenessSearch {
    /// Incident the countermeasure addresses.
    #[serde(default)]
    pub incident_id: Option<EntityId>,
    /// Substring of the countermeasure name.
    #[serde(default)]
    pub measure: Option<String>,
    /// Evaluating user.
    #[serde(default)]
    pub evaluated_by: Option<EntityId>,
    /// Earliest measurement time, inclusive.
    #[serde(default)]
    pub measured_from: Option<DateTime<Utc>>,
    /// Latest measurement time, inclusive.
    #[serde(default)]
    pub measured_to: Option<DateTime<Utc>>,
    /// Smallest improvement rate, inclusive.
    #[serde(default)]
    pub min_improvement: Option<f64>,
    /// Ordering and paging.
    #[serde(flatten)]
    pub paging: Paging,
}

impl SearchCriteria<Effectiveness> for EffectivenessSearch {
    type SortKey = EffectivenessSortKey;

    fn filter(&self) -> Filter<Effectiveness> {
        Filter::new()
            .eq(self.incident_id, |e: &Effectiveness| e.incident_id)
            .contains(self.measure.as_deref(), |e: &Effectiveness| e.measure.as_str())
            .eq(self.evaluated_by, |e: &Effectiveness| e.evaluated_by)
            .range(self.measured_from, self.measured_to, |e: &Effectiveness| {
                e.measured_at
            })
            .range(self.min_improvement, None, |e: &Effectiveness| {
                e.improvement_rate()
            })
    }

    fn paging(&self) -> &Paging {
        &self.paging
    }
}

impl EntityRepository<Effectiveness> {
    /// Measurements recorded for one incident.
    pub async fn find_by_incident(&self, incident_id: EntityId) -> AppResult<Vec<Effectiveness>> {
        self.find(&Filter::new().eq(Some(incident_id), |e: &Effectiveness| e.incident_id))
            .await
    }

    /// The most recent measurement for one incident.
    pub async fn latest_for_incident(&self, incident_id: EntityId) -> AppResult<Option<Effectiveness>> {
        Ok(self
            .find_by_incident(incident_id)
            .await?
            .into_iter()
            .max_by(|a, b| a.measured_at.cmp(&b.measured_at).then(a.meta.id.cmp(&b.meta.id))))
    }
}
