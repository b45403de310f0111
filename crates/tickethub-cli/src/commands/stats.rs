//! Dashboard statistics commands.

use clap::{Args, Subcommand, ValueEnum};
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use tickethub_core::config::AppConfig;
use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityId;
use tickethub_service::{BarChart, ChartSeries, Period, StatisticsService};

/// Arguments for the stats command
#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Statistics subcommand
    #[command(subcommand)]
    pub command: StatsCommand,
}

/// Period selection shared by the period-scoped subcommands.
#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Restrict to incidents reported in this year
    #[arg(long)]
    pub year: Option<i32>,
    /// Restrict to this month (1-12); needs `--year`
    #[arg(long, requires = "year")]
    pub month: Option<u32>,
}

impl PeriodArgs {
    fn period(&self) -> AppResult<Period> {
        Period::new(self.year, self.month)
    }
}

/// Pie chart breakdowns
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartKind {
    /// Incidents by workflow status
    Status,
    /// Incidents by trouble type
    TroubleType,
    /// Incidents by damage type
    DamageType,
    /// Incidents by warehouse
    Warehouse,
}

/// Statistics subcommands
#[derive(Debug, Subcommand)]
pub enum StatsCommand {
    /// Totals, status and priority counts, resolution time, and PPM
    Summary {
        /// Reporting period
        #[command(flatten)]
        period: PeriodArgs,
        /// Shipments handled in the period, the PPM denominator
        #[arg(long)]
        shipments: i64,
    },
    /// Category breakdown for a pie chart
    Chart {
        /// Category to break down by
        #[arg(value_enum)]
        kind: ChartKind,
        /// Reporting period
        #[command(flatten)]
        period: PeriodArgs,
    },
    /// Incidents per day of one month
    Daily {
        /// Year
        #[arg(long)]
        year: i32,
        /// Month (1-12)
        #[arg(long)]
        month: u32,
    },
    /// Incidents per month of one year
    Monthly {
        /// Year
        #[arg(long)]
        year: i32,
    },
    /// Mean improvement rate of countermeasures
    Improvement {
        /// Restrict to one incident
        #[arg(long)]
        incident: Option<EntityId>,
    },
}

#[derive(Debug, Tabled)]
struct ChartRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Incidents")]
    value: u64,
    #[tabled(rename = "Colour")]
    color: String,
}

#[derive(Debug, Tabled)]
struct BarRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Incidents")]
    value: u64,
}

/// Execute statistics commands
pub async fn execute(args: &StatsArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let uow = super::open_unit_of_work(config).await?;
    let service = StatisticsService::new(uow, config.statistics.clone());

    match &args.command {
        StatsCommand::Summary { period, shipments } => {
            let summary = service.summary(period.period()?, *shipments).await?;
            match format {
                OutputFormat::Json => output::print_json(&summary),
                OutputFormat::Table => {
                    println!("Incident summary");
                    output::print_kv("Total", &summary.total_count.to_string());
                    for entry in &summary.counts_by_status {
                        output::print_kv(entry.status.as_str(), &entry.count.to_string());
                    }
                    for entry in &summary.counts_by_priority {
                        output::print_kv(entry.priority.as_str(), &entry.count.to_string());
                    }
                    output::print_kv(
                        "Avg resolution (h)",
                        &format!(
                            "{:.1}",
                            summary.average_resolution_time.num_minutes() as f64 / 60.0
                        ),
                    );
                    output::print_kv("PPM", &format!("{:.2}", summary.ppm));
                }
            }
        }
        StatsCommand::Chart { kind, period } => {
            let period = period.period()?;
            let series = match kind {
                ChartKind::Status => service.status_chart(period).await?,
                ChartKind::TroubleType => service.trouble_type_chart(period).await?,
                ChartKind::DamageType => service.damage_type_chart(period).await?,
                ChartKind::Warehouse => service.warehouse_chart(period).await?,
            };
            print_series(series, format);
        }
        StatsCommand::Daily { year, month } => {
            print_bars(service.daily_chart(*year, *month).await?, format);
        }
        StatsCommand::Monthly { year } => {
            print_bars(service.monthly_chart(*year).await?, format);
        }
        StatsCommand::Improvement { incident } => {
            let rate = service.average_improvement(*incident).await?;
            match format {
                OutputFormat::Json => {
                    output::print_json(&serde_json::json!({ "averageImprovement": rate }))
                }
                OutputFormat::Table => output::print_kv("Average improvement", &format!("{rate:.2}")),
            }
        }
    }

    Ok(())
}

fn print_series(series: ChartSeries, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(&series),
        OutputFormat::Table => {
            println!("{}", series.title);
            let rows: Vec<ChartRow> = series
                .items
                .into_iter()
                .map(|item| ChartRow {
                    label: item.label,
                    value: item.value,
                    color: item.color.unwrap_or_default(),
                })
                .collect();
            output::print_table(&rows);
        }
    }
}

fn print_bars(chart: BarChart, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(&chart),
        OutputFormat::Table => {
            println!("{}", chart.title);
            let values = chart
                .series
                .first()
                .map(|s| s.data.clone())
                .unwrap_or_default();
            let rows: Vec<BarRow> = chart
                .labels
                .into_iter()
                .zip(values)
                .map(|(label, value)| BarRow { label, value })
                .collect();
            output::print_table(&rows);
        }
    }
}
