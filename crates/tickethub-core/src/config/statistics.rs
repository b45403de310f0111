//! Dashboard statistics configuration.

use serde::{Deserialize, Serialize};

/// Settings for chart series produced by the statistics aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Label of the bucket collecting unknown category values.
    #[serde(default = "default_other_label")]
    pub other_label: String,
    /// Colour palette cycled over pie chart slices.
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            other_label: default_other_label(),
            palette: default_palette(),
        }
    }
}

fn default_other_label() -> String {
    "Other".to_string()
}

fn default_palette() -> Vec<String> {
    ["#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}
