//! Loads data through a unit of work and aggregates it for dashboards.

use std::sync::Arc;

use tracing::info;

use tickethub_core::config::StatisticsConfig;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_database::UnitOfWork;
use tickethub_entity::master::Named;
use tickethub_entity::Incident;

use super::{
    BarChart, ChartSeries, Period, StatisticsSummary, average_improvement, category_series,
    daily_chart, monthly_chart, status_series, summarize,
};

/// Dashboard statistics over the incident set.
pub struct StatisticsService {
    uow: Arc<UnitOfWork>,
    config: StatisticsConfig,
}

impl StatisticsService {
    /// Create a statistics service.
    pub fn new(uow: Arc<UnitOfWork>, config: StatisticsConfig) -> Self {
        Self { uow, config }
    }

    async fn incidents_in(&self, period: Period) -> AppResult<Vec<Incident>> {
        self.uow
            .incidents()
            .find(&Filter::matching(move |i: &Incident| {
                period.contains(i.occurred_at)
            }))
            .await
    }

    /// Headline numbers for `period`.
    pub async fn summary(&self, period: Period, total_shipments: i64) -> AppResult<StatisticsSummary> {
        let incidents = self.incidents_in(period).await?;
        let summary = summarize(&incidents, &Period::all(), total_shipments);
        info!(
            total = summary.total_count,
            ppm = summary.ppm,
            year = period.year,
            month = period.month,
            "Statistics summary computed"
        );
        Ok(summary)
    }

    /// Pie series by status.
    pub async fn status_chart(&self, period: Period) -> AppResult<ChartSeries> {
        let incidents = self.incidents_in(period).await?;
        Ok(status_series(&incidents, &self.config))
    }

    /// Pie series by trouble type.
    pub async fn trouble_type_chart(&self, period: Period) -> AppResult<ChartSeries> {
        let incidents = self.incidents_in(period).await?;
        let categories = labels(self.uow.trouble_types().get_all().await?);
        Ok(category_series(
            "Incidents by trouble type",
            incidents.iter().map(|i| Some(i.trouble_type_id)),
            &categories,
            &self.config,
        ))
    }

    /// Pie series by damage type; incidents without one count as other.
    pub async fn damage_type_chart(&self, period: Period) -> AppResult<ChartSeries> {
        let incidents = self.incidents_in(period).await?;
        let categories = labels(self.uow.damage_types().get_all().await?);
        Ok(category_series(
            "Incidents by damage type",
            incidents.iter().map(|i| i.damage_type_id),
            &categories,
            &self.config,
        ))
    }

    /// Pie series by warehouse.
    pub async fn warehouse_chart(&self, period: Period) -> AppResult<ChartSeries> {
        let incidents = self.incidents_in(period).await?;
        let categories = labels(self.uow.warehouses().get_all().await?);
        Ok(category_series(
            "Incidents by warehouse",
            incidents.iter().map(|i| Some(i.warehouse_id)),
            &categories,
            &self.config,
        ))
    }

    /// Incidents per day of one month.
    pub async fn daily_chart(&self, year: i32, month: u32) -> AppResult<BarChart> {
        let period = Period::new(Some(year), Some(month))?;
        let incidents = self.incidents_in(period).await?;
        daily_chart(&incidents, year, month)
    }

    /// Incidents per month of one year.
    pub async fn monthly_chart(&self, year: i32) -> AppResult<BarChart> {
        let incidents = self.incidents_in(Period::new(Some(year), None)?).await?;
        Ok(monthly_chart(&incidents, year))
    }

    /// Mean improvement rate of the measurements for one incident, or of
    /// every measurement.
    pub async fn average_improvement(&self, incident_id: Option<EntityId>) -> AppResult<f64> {
        let repo = self.uow.effectiveness();
        let measurements = match incident_id {
            Some(id) => repo.find_by_incident(id).await?,
            None => repo.get_all().await?,
        };
        Ok(average_improvement(&measurements))
    }
}

fn labels<T: Named>(rows: Vec<T>) -> Vec<(EntityId, String)> {
    rows.into_iter()
        .map(|row| (row.id(), row.label().to_string()))
        .collect()
}
