//! Incident status and priority enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow state of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Reported, nobody working on it yet.
    Open,
    /// Being investigated.
    InProgress,
    /// A resolution has been recorded.
    Resolved,
    /// Resolution confirmed; no further work.
    Closed,
}

impl IncidentStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    /// Whether the incident counts as handled for statistics.
    pub fn is_resolved_or_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Urgency of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentPriority {
    /// Cosmetic or informational.
    Low,
    /// Default priority.
    Medium,
    /// Customer-visible impact.
    High,
    /// Shipment lost or safety issue.
    Critical,
}

impl IncidentPriority {
    /// Every priority, lowest first.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Return the numeric priority (higher = more urgent).
    pub fn rank(&self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Return the priority as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for IncidentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
