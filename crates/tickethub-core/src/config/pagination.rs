//! Pagination limits applied to search criteria.

use serde::{Deserialize, Serialize};

/// Paging defaults and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when a criteria object does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    /// Largest page size a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    500
}
