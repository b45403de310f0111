//! Audit log entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, EntityMeta, Relation};

use crate::tables;
use crate::validation::{reference, required_text};

/// An immutable record of a change made by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// The user who performed the action.
    pub actor_id: EntityId,
    /// The action performed (e.g., `"incident.report"`).
    pub action: String,
    /// Table of the affected entity.
    pub entity_type: String,
    /// Identity of the affected entity.
    pub entity_id: EntityId,
    /// Additional details about the action (JSON).
    pub details: Option<serde_json::Value>,
}

impl_entity!(
    AuditLog,
    tables::AUDIT_LOGS,
    [Relation::belongs_to("actor", tables::USERS, "actor_id")]
);

impl AuditLog {
    /// Record an action on a persisted entity.
    pub fn record<T: Entity>(
        actor_id: EntityId,
        action: &str,
        target: &T,
        details: Option<serde_json::Value>,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            actor_id: reference("actor_id", actor_id)?,
            action: required_text("action", action)?,
            entity_type: T::TABLE.to_string(),
            entity_id: reference("entity_id", target.id())?,
            details,
        })
    }
}
