//! Warehouse entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityMeta;

use crate::tables;
use crate::validation::{optional_text, required_text};

/// A site where goods are stored and incidents are recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warehouse {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Short unique code, e.g. `"OSK-01"`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Free-form address or region.
    pub location: Option<String>,
    /// Whether new incidents may reference this warehouse.
    pub is_active: bool,
}

impl_entity!(Warehouse, tables::WAREHOUSES);

impl Warehouse {
    /// Create a new active warehouse.
    pub fn new(code: &str, name: &str, location: Option<&str>) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            code: required_text("code", code)?.to_uppercase(),
            name: required_text("name", name)?,
            location: optional_text(location),
            is_active: true,
        })
    }

    /// Stop accepting new incidents for this warehouse.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.meta.touch();
    }
}
