//! Shipping company entity model.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::EntityMeta;

use crate::tables;
use crate::validation::{optional_text, required_text};

/// A carrier responsible for a shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingCompany {
    /// Identity and audit fields.
    #[serde(flatten)]
    pub meta: EntityMeta,
    /// Short unique code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Where claims are sent.
    pub contact_email: Option<String>,
    /// Whether new incidents may reference this carrier.
    pub is_active: bool,
}

impl_entity!(ShippingCompany, tables::SHIPPING_COMPANIES);

impl ShippingCompany {
    /// Create a new active carrier.
    pub fn new(code: &str, name: &str, contact_email: Option<&str>) -> AppResult<Self> {
        Ok(Self {
            meta: EntityMeta::new(),
            code: required_text("code", code)?.to_uppercase(),
            name: required_text("name", name)?,
            contact_email: optional_text(contact_email),
            is_active: true,
        })
    }

    /// Stop accepting new incidents for this carrier.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.meta.touch();
    }
}
