//! Database migration management commands.

use clap::{Args, Subcommand};

use crate::output;
use tickethub_core::config::{AppConfig, StoreBackend};
use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_database::DatabasePool;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> AppResult<()> {
    if config.store.backend != StoreBackend::Postgres {
        return Err(AppError::configuration(
            "migrations require store.backend = \"postgres\"",
        ));
    }

    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            tickethub_database::migration::run_migrations(pool.pool()).await?;
            output::print_success("All migrations applied successfully.");
        }
    }

    pool.close().await;
    Ok(())
}
