//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles a user can hold in the incident workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full administrator, maintains master data.
    Admin,
    /// Triages and resolves incidents.
    Manager,
    /// Files incident reports.
    Reporter,
}

impl UserRole {
    /// Whether the role may resolve or close incidents.
    pub fn can_resolve(&self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Reporter => "reporter",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
