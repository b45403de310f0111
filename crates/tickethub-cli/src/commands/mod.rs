//! CLI command definitions and dispatch.

pub mod incidents;
pub mod migrate;
pub mod stats;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::output::OutputFormat;
use tickethub_core::config::{AppConfig, StoreBackend};
use tickethub_core::result::AppResult;
use tickethub_database::{DatabasePool, MemoryStore, PgStore, Store, UnitOfWork};

/// TicketHub: logistics incident tracking
#[derive(Debug, Parser)]
#[command(name = "tickethub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Environment overlay, loaded from `config/{env}.toml`
    #[arg(short, long)]
    pub env: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Dashboard statistics
    Stats(stats::StatsArgs),
    /// Incident queries
    Incidents(incidents::IncidentsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Stats(args) => stats::execute(args, config, self.format).await,
            Commands::Incidents(args) => incidents::execute(args, config, self.format).await,
        }
    }
}

/// Open the configured store and wrap it in a unit of work.
///
/// Ctrl-C cancels the token, so an in-flight store call ends with a
/// cancellation error instead of being killed mid-write.
pub async fn open_unit_of_work(config: &AppConfig) -> AppResult<Arc<UnitOfWork>> {
    let store: Arc<dyn Store> = match config.store.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; data does not outlive this process");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres => {
            let pool = DatabasePool::connect(&config.database).await?;
            Arc::new(PgStore::from_pool(&pool))
        }
    };
    info!(store = store.name(), "Store opened");

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    Ok(Arc::new(UnitOfWork::with_options(
        store,
        cancel,
        &config.pagination,
    )))
}
