//! Master data lookups.

use tickethub_core::result::AppResult;
use tickethub_core::traits::Repository;
use tickethub_core::types::filter::Filter;
use tickethub_entity::{DamageType, ShippingCompany, TroubleType, Warehouse};

use crate::repository::EntityRepository;

/// Repository for warehouses.
pub type WarehouseRepository = EntityRepository<Warehouse>;
/// Repository for shipping companies.
pub type ShippingCompanyRepository = EntityRepository<ShippingCompany>;
/// Repository for trouble types.
pub type TroubleTypeRepository = EntityRepository<TroubleType>;
/// Repository for damage types.
pub type DamageTypeRepository = EntityRepository<DamageType>;

fn same_code(stored: &str, wanted: &str) -> bool {
    stored.eq_ignore_ascii_case(wanted.trim())
}

impl EntityRepository<Warehouse> {
    /// Find a warehouse by its code, ignoring case.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<Warehouse>> {
        let code = code.to_string();
        self.first_or_default(&Filter::matching(move |w: &Warehouse| {
            same_code(&w.code, &code)
        }))
        .await
    }

    /// Warehouses still in use.
    pub async fn find_active(&self) -> AppResult<Vec<Warehouse>> {
        self.find(&Filter::matching(|w: &Warehouse| w.is_active)).await
    }
}

impl EntityRepository<ShippingCompany> {
    /// Find a carrier by its code, ignoring case.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<ShippingCompany>> {
        let code = code.to_string();
        self.first_or_default(&Filter::matching(move |c: &ShippingCompany| {
            same_code(&c.code, &code)
        }))
        .await
    }

    /// Carriers still in use.
    pub async fn find_active(&self) -> AppResult<Vec<ShippingCompany>> {
        self.find(&Filter::matching(|c: &ShippingCompany| c.is_active))
            .await
    }
}

impl EntityRepository<TroubleType> {
    /// Find a trouble type by name, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<TroubleType>> {
        let name = name.to_string();
        self.first_or_default(&Filter::matching(move |t: &TroubleType| {
            same_code(&t.name, &name)
        }))
        .await
    }
}

impl EntityRepository<DamageType> {
    /// Find a damage type by name, ignoring case.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<DamageType>> {
        let name = name.to_string();
        self.first_or_default(&Filter::matching(move |d: &DamageType| {
            same_code(&d.name, &name)
        }))
        .await
    }
}
