//! Incident query commands.

use clap::{Args, Subcommand, ValueEnum};
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use tickethub_core::config::AppConfig;
use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityId;
use tickethub_database::Paging;
use tickethub_database::repositories::IncidentSearch;
use tickethub_entity::IncidentStatus;
use tickethub_service::{IncidentService, IncidentView};

/// Arguments for the incidents command
#[derive(Debug, Args)]
pub struct IncidentsArgs {
    /// Incident subcommand
    #[command(subcommand)]
    pub command: IncidentsCommand,
}

/// Workflow status filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    /// Reported, not yet picked up
    Open,
    /// Under investigation
    InProgress,
    /// Resolution recorded
    Resolved,
    /// Resolution confirmed
    Closed,
}

impl From<StatusArg> for IncidentStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Open => Self::Open,
            StatusArg::InProgress => Self::InProgress,
            StatusArg::Resolved => Self::Resolved,
            StatusArg::Closed => Self::Closed,
        }
    }
}

/// Incident subcommands
#[derive(Debug, Subcommand)]
pub enum IncidentsCommand {
    /// List incidents, one page at a time
    List {
        /// Only incidents in this status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Only incidents at this warehouse
        #[arg(long)]
        warehouse: Option<EntityId>,
        /// Substring of title, description, or tracking number
        #[arg(long)]
        keyword: Option<String>,
        /// Sort field, e.g. `occurred_at`, `priority`, `title`
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort ascending instead of descending
        #[arg(long)]
        ascending: bool,
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Rows per page; defaults to `pagination.default_page_size`
        #[arg(long)]
        page_size: Option<u64>,
    },
}

#[derive(Debug, Tabled)]
struct IncidentRow {
    #[tabled(rename = "ID")]
    id: EntityId,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Warehouse")]
    warehouse: String,
    #[tabled(rename = "Carrier")]
    shipping_company: String,
    #[tabled(rename = "Trouble")]
    trouble_type: String,
    #[tabled(rename = "Reporter")]
    reporter: String,
    #[tabled(rename = "Occurred")]
    occurred_at: String,
}

impl From<IncidentView> for IncidentRow {
    fn from(view: IncidentView) -> Self {
        Self {
            id: view.id,
            title: view.title,
            status: view.status.to_string(),
            priority: view.priority.to_string(),
            warehouse: view.warehouse,
            shipping_company: view.shipping_company,
            trouble_type: view.trouble_type,
            reporter: view.reporter,
            occurred_at: view.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute incident commands
pub async fn execute(
    args: &IncidentsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let uow = super::open_unit_of_work(config).await?;
    let service = IncidentService::new(uow);

    match &args.command {
        IncidentsCommand::List {
            status,
            warehouse,
            keyword,
            sort_by,
            ascending,
            page,
            page_size,
        } => {
            let mut paging = Paging::page(
                *page,
                page_size.unwrap_or(config.pagination.default_page_size),
            );
            if let Some(sort_by) = sort_by {
                paging = paging.sorted_by(sort_by, *ascending);
            } else {
                paging.ascending = *ascending;
            }
            let search = IncidentSearch {
                status: status.map(IncidentStatus::from),
                warehouse_id: *warehouse,
                keyword: keyword.clone(),
                paging,
                ..IncidentSearch::default()
            };

            let result = service.list(&search).await?;
            match format {
                OutputFormat::Json => output::print_json(&result),
                OutputFormat::Table => {
                    let summary = format!(
                        "page {} of {} ({} incidents)",
                        result.page, result.total_pages, result.total_count
                    );
                    let rows: Vec<IncidentRow> =
                        result.items.into_iter().map(IncidentRow::from).collect();
                    output::print_table(&rows);
                    println!("{summary}");
                }
            }
        }
    }

    Ok(())
}
