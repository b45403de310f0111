//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every section falls back to its defaults when absent.

pub mod database;
pub mod logging;
pub mod pagination;
pub mod statistics;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::pagination::PaginationConfig;
pub use self::statistics::StatisticsConfig;
pub use self::store::{StoreBackend, StoreConfig};

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (base file + environment overlay).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Store backend selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Paging defaults and limits for search criteria.
    #[serde(default)]
    pub pagination: PaginationConfig,
    /// Dashboard statistics settings.
    #[serde(default)]
    pub statistics: StatisticsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the base configuration file with an optional environment
    /// overlay (`config/{env}.toml`) and environment variables prefixed
    /// with `TICKETHUB__`.
    pub fn load(path: &str, env: Option<&str>) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().add_source(config::File::with_name(path).required(false));

        if let Some(env) = env {
            builder = builder
                .add_source(config::File::with_name(&format!("config/{env}")).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("TICKETHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load("config/does-not-exist", None).expect("defaults");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.pagination.default_page_size, 20);
        assert_eq!(config.statistics.other_label, "Other");
        assert_eq!(config.logging.level, "info");
    }
}
