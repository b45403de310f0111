//! # tickethub-entity
//!
//! Domain entity models for TicketHub. Every struct in this crate is a
//! persisted record that embeds [`EntityMeta`] and implements [`Entity`].
//! Entities refer to each other by foreign-key id only; related records
//! are fetched through the repository `*_with_include` operations.
//!
//! [`EntityMeta`]: tickethub_core::traits::EntityMeta
//! [`Entity`]: tickethub_core::traits::Entity

#[macro_use]
mod macros;

pub mod attachment;
pub mod audit;
pub mod effectiveness;
pub mod incident;
pub mod master;
pub mod tables;
pub mod user;
pub mod validation;

pub use attachment::{Attachment, NewAttachment};
pub use audit::AuditLog;
pub use effectiveness::{Effectiveness, NewEffectiveness};
pub use incident::{Incident, IncidentPriority, IncidentStatus, NewIncident};
pub use master::{DamageType, ShippingCompany, TroubleType, Warehouse};
pub use user::{User, UserRole};
