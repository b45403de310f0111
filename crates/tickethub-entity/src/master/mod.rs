//! Reference (master) data that incidents point at.

pub mod damage_type;
pub mod shipping_company;
pub mod trouble_type;
pub mod warehouse;

pub use damage_type::DamageType;
pub use shipping_company::ShippingCompany;
pub use trouble_type::TroubleType;
pub use warehouse::Warehouse;

use tickethub_core::traits::Entity;

/// An entity with a human-readable label for dashboards and lists.
pub trait Named: Entity {
    /// Label shown in place of the foreign-key id.
    fn label(&self) -> &str;
}

impl Named for Warehouse {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for ShippingCompany {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for TroubleType {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for DamageType {
    fn label(&self) -> &str {
        &self.name
    }
}

impl Named for crate::user::User {
    fn label(&self) -> &str {
        &self.display_name
    }
}
