//! Dashboard statistics.
//!
//! The functions in this module are pure: they take already-loaded
//! entities and never touch the store. [`service::StatisticsService`] loads
//! the data through a unit of work and hands it to them.
//!
//! Every rate and average returns `0` for an empty population or a
//! non-positive denominator instead of failing.

pub mod service;

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Serialize, Serializer};

use tickethub_core::config::StatisticsConfig;
use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_entity::{Effectiveness, Incident, IncidentPriority, IncidentStatus};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Calendar window applied to incident occurrence times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Period {
    /// Calendar year, or every year.
    pub year: Option<i32>,
    /// Month 1-12, or every month. Without a year it matches that month of
    /// any year.
    pub month: Option<u32>,
}

impl Period {
    /// Every incident.
    pub fn all() -> Self {
        Self::default()
    }

    /// Validate and build a period.
    pub fn new(year: Option<i32>, month: Option<u32>) -> AppResult<Self> {
        if let Some(month) = month {
            if !(1..=12).contains(&month) {
                return Err(AppError::validation(format!(
                    "month must be between 1 and 12, got {month}"
                )));
            }
        }
        Ok(Self { year, month })
    }

    /// Whether `at` falls inside the period.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.year.is_none_or(|y| at.year() == y) && self.month.is_none_or(|m| at.month() == m)
    }
}

/// Number of incidents in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    /// The status.
    pub status: IncidentStatus,
    /// How many incidents hold it.
    pub count: u64,
}

/// Number of incidents at one priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriorityCount {
    /// The priority.
    pub priority: IncidentPriority,
    /// How many incidents hold it.
    pub count: u64,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    /// Incidents in the period.
    pub total_count: u64,
    /// One entry per status, zero-filled.
    pub counts_by_status: Vec<StatusCount>,
    /// One entry per priority, zero-filled.
    pub counts_by_priority: Vec<PriorityCount>,
    /// Mean time from report to resolution, serialized in seconds.
    #[serde(serialize_with = "duration_seconds")]
    pub average_resolution_time: Duration,
    /// Resolved or closed incidents per million shipments.
    pub ppm: f64,
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartItem {
    /// Category label.
    pub label: String,
    /// Count in the category.
    pub value: u64,
    /// Display colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A categorical series for pie charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Chart title.
    pub title: String,
    /// Slices, in category order with the catch-all bucket last.
    pub items: Vec<ChartItem>,
}

/// One named row of bar values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    /// Series name.
    pub name: String,
    /// One value per label.
    pub data: Vec<u64>,
}

/// A time-bucketed bar chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChart {
    /// Renderer hint, always `"bar"`.
    pub chart_type: String,
    /// Chart title.
    pub title: String,
    /// Bucket labels.
    pub labels: Vec<String>,
    /// Series aligned with `labels`.
    pub series: Vec<BarSeries>,
}

fn duration_seconds<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    let seconds = value.num_seconds() as f64 + f64::from(value.subsec_nanos()) / 1e9;
    serializer.serialize_f64(seconds)
}

/// Incidents whose occurrence falls inside `period`.
pub fn within<'a>(incidents: &'a [Incident], period: &Period) -> Vec<&'a Incident> {
    incidents
        .iter()
        .filter(|i| period.contains(i.occurred_at))
        .collect()
}

/// Count per status, in workflow order, including zero counts.
pub fn counts_by_status<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> Vec<StatusCount> {
    let counts = tally(incidents.into_iter().map(|i| i.status));
    IncidentStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: counts.get(status).copied().unwrap_or(0),
        })
        .collect()
}

/// Count per priority, lowest first, including zero counts.
pub fn counts_by_priority<'a>(
    incidents: impl IntoIterator<Item = &'a Incident>,
) -> Vec<PriorityCount> {
    let counts = tally(incidents.into_iter().map(|i| i.priority));
    IncidentPriority::ALL
        .iter()
        .map(|priority| PriorityCount {
            priority: *priority,
            count: counts.get(priority).copied().unwrap_or(0),
        })
        .collect()
}

/// Number of resolved or closed incidents.
pub fn resolved_count<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> u64 {
    incidents
        .into_iter()
        .filter(|i| i.status.is_resolved_or_closed())
        .count() as u64
}

/// Mean report-to-resolution time over resolved or closed incidents.
///
/// Durations are summed in nanoseconds, so the mean is exact to the
/// nanosecond. Zero when no incident is resolved.
pub fn average_resolution_time<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> Duration {
    let mut total: i128 = 0;
    let mut count: i128 = 0;
    for elapsed in incidents.into_iter().filter_map(Incident::resolution_time) {
        total += i128::from(elapsed.num_seconds()) * 1_000_000_000
            + i128::from(elapsed.subsec_nanos());
        count += 1;
    }
    if count == 0 {
        return Duration::zero();
    }
    let mean = total / count;
    Duration::seconds((mean / 1_000_000_000) as i64)
        + Duration::nanoseconds((mean % 1_000_000_000) as i64)
}

/// Defects per million shipments. Zero when `total_shipments <= 0`.
pub fn ppm(resolved: u64, total_shipments: i64) -> f64 {
    if total_shipments <= 0 {
        return 0.0;
    }
    resolved as f64 * 1_000_000.0 / total_shipments as f64
}

/// Mean improvement rate of a set of measurements; zero when empty.
pub fn average_improvement(measurements: &[Effectiveness]) -> f64 {
    if measurements.is_empty() {
        return 0.0;
    }
    let total: f64 = measurements.iter().map(Effectiveness::improvement_rate).sum();
    total / measurements.len() as f64
}

/// Build the headline summary for `period`.
pub fn summarize(incidents: &[Incident], period: &Period, total_shipments: i64) -> StatisticsSummary {
    let selected = within(incidents, period);
    let resolved = resolved_count(selected.iter().copied());
    StatisticsSummary {
        total_count: selected.len() as u64,
        counts_by_status: counts_by_status(selected.iter().copied()),
        counts_by_priority: counts_by_priority(selected.iter().copied()),
        average_resolution_time: average_resolution_time(selected.iter().copied()),
        ppm: ppm(resolved, total_shipments),
    }
}

/// Group-count `keys` into labelled slices.
///
/// `categories` fixes the known keys, their labels, and slice order. Keys
/// missing from it, and absent keys, land in one trailing bucket labelled
/// `config.other_label`. Empty categories are left out. Colours cycle
/// through `config.palette`.
pub fn category_series<K, I>(
    title: &str,
    keys: I,
    categories: &[(K, String)],
    config: &StatisticsConfig,
) -> ChartSeries
where
    K: Eq + Hash,
    I: IntoIterator<Item = Option<K>>,
{
    let mut counts = vec![0_u64; categories.len()];
    let mut other = 0_u64;
    let index: HashMap<&K, usize> = categories
        .iter()
        .enumerate()
        .map(|(position, (key, _))| (key, position))
        .collect();
    for key in keys {
        match key.as_ref().and_then(|k| index.get(k)) {
            Some(position) => counts[*position] += 1,
            None => other += 1,
        }
    }

    let mut slices: Vec<(String, u64)> = categories
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|((_, label), count)| (label.clone(), count))
        .collect();
    if other > 0 {
        slices.push((config.other_label.clone(), other));
    }

    ChartSeries {
        title: title.to_string(),
        items: slices
            .into_iter()
            .enumerate()
            .map(|(position, (label, value))| ChartItem {
                label,
                value,
                color: palette_color(config, position),
            })
            .collect(),
    }
}

/// Pie series over incident status.
pub fn status_series<'a>(
    incidents: impl IntoIterator<Item = &'a Incident>,
    config: &StatisticsConfig,
) -> ChartSeries {
    let categories: Vec<(IncidentStatus, String)> = IncidentStatus::ALL
        .iter()
        .map(|s| (*s, s.as_str().to_string()))
        .collect();
    category_series(
        "Incidents by status",
        incidents.into_iter().map(|i| Some(i.status)),
        &categories,
        config,
    )
}

/// Bar chart of incidents per day of `month` in `year`.
pub fn daily_chart<'a>(
    incidents: impl IntoIterator<Item = &'a Incident>,
    year: i32,
    month: u32,
) -> AppResult<BarChart> {
    let days = days_in_month(year, month)?;
    let mut data = vec![0_u64; days as usize];
    let period = Period::new(Some(year), Some(month))?;
    for incident in incidents {
        if period.contains(incident.occurred_at) {
            data[incident.occurred_at.day0() as usize] += 1;
        }
    }
    Ok(BarChart {
        chart_type: "bar".to_string(),
        title: format!("Incidents per day, {year}-{month:02}"),
        labels: (1..=days).map(|d| d.to_string()).collect(),
        series: vec![BarSeries {
            name: "Incidents".to_string(),
            data,
        }],
    })
}

/// Bar chart of incidents per month of `year`.
pub fn monthly_chart<'a>(incidents: impl IntoIterator<Item = &'a Incident>, year: i32) -> BarChart {
    let mut data = vec![0_u64; 12];
    for incident in incidents {
        if incident.occurred_at.year() == year {
            data[incident.occurred_at.month0() as usize] += 1;
        }
    }
    BarChart {
        chart_type: "bar".to_string(),
        title: format!("Incidents per month, {year}"),
        labels: MONTH_LABELS.iter().map(|m| m.to_string()).collect(),
        series: vec![BarSeries {
            name: "Incidents".to_string(),
            data,
        }],
    }
}

fn days_in_month(year: i32, month: u32) -> AppResult<u32> {
    let invalid = || AppError::validation(format!("invalid month {year}-{month}"));
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(invalid)?;
    Ok((next - first).num_days() as u32)
}

fn palette_color(config: &StatisticsConfig, position: usize) -> Option<String> {
    if config.palette.is_empty() {
        return None;
    }
    config.palette.get(position % config.palette.len()).cloned()
}

fn tally<K: Eq + Hash>(keys: impl Iterator<Item = K>) -> HashMap<K, u64> {
    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tickethub_entity::{NewEffectiveness, NewIncident};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).single().expect("valid")
    }

    fn incident(occurred: DateTime<Utc>, priority: IncidentPriority) -> Incident {
        Incident::new(NewIncident {
            title: "Crushed carton".into(),
            description: "Top layer collapsed".into(),
            priority,
            warehouse_id: 1,
            shipping_company_id: 1,
            trouble_type_id: 1,
            damage_type_id: None,
            reporter_id: 1,
            tracking_number: None,
            damaged_quantity: 1,
            occurred_at: occurred,
            reported_at: Some(occurred),
        })
        .expect("valid")
    }

    fn resolved(occurred: DateTime<Utc>, after: Duration) -> Incident {
        let mut incident = incident(occurred, IncidentPriority::Low);
        incident
            .resolve_at("Refunded", occurred + after)
            .expect("resolve");
        incident
    }

    #[test]
    fn test_ppm_guards_and_scales() {
        assert_eq!(ppm(50, 100_000), 500.0);
        assert_eq!(ppm(50, 0), 0.0);
        assert_eq!(ppm(50, -3), 0.0);
        assert_eq!(ppm(0, 100), 0.0);
    }

    #[test]
    fn test_average_resolution_is_exact_mean() {
        let base = at(2024, 5, 1, 8);
        let incidents = vec![
            resolved(base, Duration::hours(2)),
            resolved(base, Duration::hours(3) + Duration::nanoseconds(1)),
            resolved(base, Duration::minutes(30)),
            incident(base, IncidentPriority::High),
        ];
        let expected = (Duration::hours(2)
            + Duration::hours(3)
            + Duration::nanoseconds(1)
            + Duration::minutes(30))
            / 3;
        assert_eq!(average_resolution_time(&incidents), expected);
        assert_eq!(average_resolution_time(&[]), Duration::zero());
    }

    #[test]
    fn test_empty_summary_is_all_zero() {
        let summary = summarize(&[], &Period::all(), 1_000);
        assert_eq!(summary.total_count, 0);
        assert!(summary.counts_by_status.iter().all(|c| c.count == 0));
        assert_eq!(summary.counts_by_status.len(), 4);
        assert!(summary.counts_by_priority.iter().all(|c| c.count == 0));
        assert_eq!(summary.average_resolution_time, Duration::zero());
        assert_eq!(summary.ppm, 0.0);
    }

    #[test]
    fn test_summary_respects_period() {
        let incidents = vec![
            resolved(at(2024, 5, 3, 8), Duration::hours(4)),
            incident(at(2024, 5, 9, 8), IncidentPriority::Critical),
            incident(at(2024, 6, 1, 8), IncidentPriority::Critical),
            incident(at(2023, 5, 1, 8), IncidentPriority::Low),
        ];
        let period = Period::new(Some(2024), Some(5)).expect("valid");
        let summary = summarize(&incidents, &period, 10_000);
        assert_eq!(summary.total_count, 2);
        assert_eq!(summary.average_resolution_time, Duration::hours(4));
        assert_eq!(summary.ppm, 100.0);
        let critical = summary
            .counts_by_priority
            .iter()
            .find(|c| c.priority == IncidentPriority::Critical)
            .expect("present");
        assert_eq!(critical.count, 1);

        let any_may = Period::new(None, Some(5)).expect("valid");
        assert_eq!(summarize(&incidents, &any_may, 0).total_count, 3);
        assert!(Period::new(None, Some(13)).is_err());
    }

    #[test]
    fn test_unknown_categories_go_to_other() {
        let config = StatisticsConfig::default();
        let categories = vec![(1_i64, "Breakage".to_string()), (2, "Loss".to_string()), (3, "Delay".to_string())];
        let series = category_series(
            "By trouble type",
            [Some(1), Some(1), Some(3), Some(99), None],
            &categories,
            &config,
        );
        let labels: Vec<_> = series.items.iter().map(|i| (i.label.as_str(), i.value)).collect();
        assert_eq!(labels, vec![("Breakage", 2), ("Delay", 1), ("Other", 2)]);
        assert_eq!(series.items.iter().map(|i| i.value).sum::<u64>(), 5);
        assert_eq!(series.items[0].color.as_deref(), Some("#4e79a7"));
    }

    #[test]
    fn test_daily_and_monthly_buckets() {
        let incidents = vec![
            incident(at(2024, 2, 1, 8), IncidentPriority::Low),
            incident(at(2024, 2, 29, 8), IncidentPriority::Low),
            incident(at(2024, 2, 29, 9), IncidentPriority::Low),
            incident(at(2024, 11, 2, 9), IncidentPriority::Low),
        ];
        let daily = daily_chart(&incidents, 2024, 2).expect("valid");
        assert_eq!(daily.labels.len(), 29);
        assert_eq!(daily.series[0].data[0], 1);
        assert_eq!(daily.series[0].data[28], 2);
        assert!(daily_chart(&incidents, 2024, 0).is_err());

        let monthly = monthly_chart(&incidents, 2024);
        assert_eq!(monthly.labels[1], "Feb");
        assert_eq!(monthly.series[0].data[1], 3);
        assert_eq!(monthly.series[0].data[10], 1);
        assert_eq!(monthly.series[0].data.iter().sum::<u64>(), 4);
    }

    #[test]
    fn test_average_improvement() {
        assert_eq!(average_improvement(&[]), 0.0);
        let measurement = |before: f64, after: f64| {
            Effectiveness::new(NewEffectiveness {
                incident_id: 1,
                measure: "Stretch wrap".into(),
                before_value: before,
                after_value: after,
                measured_at: at(2024, 1, 1, 0),
                evaluated_by: 1,
                notes: None,
            })
            .expect("valid")
        };
        let rows = vec![measurement(10.0, 5.0), measurement(10.0, 10.0)];
        let expected = (rows[0].improvement_rate() + rows[1].improvement_rate()) / 2.0;
        assert_eq!(average_improvement(&rows), expected);
    }
}
