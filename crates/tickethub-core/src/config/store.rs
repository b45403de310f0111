//! Store backend configuration.

use serde::{Deserialize, Serialize};

/// Which store implementation backs the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; contents are lost on exit.
    #[default]
    Memory,
    /// PostgreSQL via the `database` section.
    Postgres,
}

/// Store selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The backend to use.
    #[serde(default)]
    pub backend: StoreBackend,
}
