//! Damage type entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityMeta;

use crate::tables;
use crate::validation::{optional_text, required_text};

/// Classification of physical damage (crushed, wet, torn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DamageType {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Unique display name.
    pub name: String,
    /// Longer explanation shown to reporters.
    pub description: Option<String>,
}

impl_entity!(DamageType, tables::DAMAGE_TYPES);

impl DamageType {
    /// Create a new damage classification.
    pub fn new(name: &str, description: Option<&str>) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            name: required_text("name", name)?,
            description: optional_text(description),
        })
    }

    /// Change the name and description.
    pub fn edit(&mut self, name: &str, description: Option<&str>) -> AppResult<()> {
        self.name = required_text("name", name)?;
        self.description = optional_text(description);
        self.meta.touch();
        Ok(())
    }
}
