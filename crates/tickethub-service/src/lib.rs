//! # tickethub-service
//!
//! Services built on the unit of work: dashboard statistics, batch
//! resolution of master-data display names, and incident workflows that
//! write an audit trail in the same transaction.

pub mod incident;
pub mod resolver;
pub mod statistics;

pub use incident::service::IncidentService;
pub use resolver::{IncidentView, MasterDataResolver, MasterNames};
pub use statistics::service::StatisticsService;
pub use statistics::{BarChart, ChartSeries, Period, StatisticsSummary};
