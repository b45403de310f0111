//! Shared fixtures for the database integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use tickethub_core::traits::{EntityId, Repository};
use tickethub_database::{MemoryStore, UnitOfWork};
use tickethub_entity::{
    DamageType, Incident, IncidentPriority, NewIncident, ShippingCompany, TroubleType, User,
    UserRole, Warehouse,
};

/// A store seeded with one row of each master table.
pub struct Fixture {
    pub store: MemoryStore,
    pub uow: UnitOfWork,
    pub reporter_id: EntityId,
    pub warehouse_id: EntityId,
    pub company_id: EntityId,
    pub trouble_type_id: EntityId,
    pub damage_type_id: EntityId,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let uow = UnitOfWork::new(Arc::new(store.clone()));

        let reporter = uow
            .users()
            .add(User::new("akira", "Akira Sato", None, UserRole::Manager).expect("user"))
            .await
            .expect("stage");
        let warehouse = uow
            .warehouses()
            .add(Warehouse::new("osk-1", "Osaka Central", None).expect("warehouse"))
            .await
            .expect("stage");
        let company = uow
            .shipping_companies()
            .add(ShippingCompany::new("yam", "Yamato Transport", None).expect("company"))
            .await
            .expect("stage");
        let trouble = uow
            .trouble_types()
            .add(TroubleType::new("Breakage", None).expect("trouble"))
            .await
            .expect("stage");
        let damage = uow
            .damage_types()
            .add(DamageType::new("Crushed", None).expect("damage"))
            .await
            .expect("stage");
        assert_eq!(uow.save_changes().await.expect("seed"), 5);

        Self {
            reporter_id: reporter.id().expect("saved"),
            warehouse_id: warehouse.id().expect("saved"),
            company_id: company.id().expect("saved"),
            trouble_type_id: trouble.id().expect("saved"),
            damage_type_id: damage.id().expect("saved"),
            store,
            uow,
        }
    }

    /// A second unit of work over the same store.
    pub fn other_uow(&self) -> UnitOfWork {
        UnitOfWork::new(Arc::new(self.store.clone()))
    }

    /// An unsaved incident occurring at `occurred_at`.
    pub fn incident_at(&self, title: &str, quantity: i64, occurred_at: DateTime<Utc>) -> Incident {
        Incident::new(NewIncident {
            title: title.to_string(),
            description: format!("{title} found during inbound inspection"),
            priority: IncidentPriority::Medium,
            warehouse_id: self.warehouse_id,
            shipping_company_id: self.company_id,
            trouble_type_id: self.trouble_type_id,
            damage_type_id: Some(self.damage_type_id),
            reporter_id: self.reporter_id,
            tracking_number: None,
            damaged_quantity: quantity,
            occurred_at,
            reported_at: Some(occurred_at + Duration::hours(1)),
        })
        .expect("valid incident")
    }

    /// An unsaved incident occurring `n` days after a fixed base date.
    pub fn incident(&self, title: &str, quantity: i64, n: i64) -> Incident {
        self.incident_at(title, quantity, base_date() + Duration::days(n))
    }

    /// Save `count` incidents titled `Incident {i}`, damaged quantity `i % 5`.
    pub async fn seed_incidents(&self, count: i64) -> Vec<EntityId> {
        let repo = self.uow.incidents();
        let mut pending = Vec::new();
        for i in 1..=count {
            pending.push(
                repo.add(self.incident(&format!("Incident {i}"), i % 5, i))
                    .await
                    .expect("stage"),
            );
        }
        self.uow.save_changes().await.expect("save");
        pending.iter().map(|p| p.id().expect("saved")).collect()
    }
}

pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().expect("valid date")
}
