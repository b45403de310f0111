//! Entity-specific repository extensions and search criteria.

pub mod attachment;
pub mod audit;
pub mod effectiveness;
pub mod incident;
pub mod master;
pub mod user;

pub use attachment::{AttachmentRepository, AttachmentSearch, AttachmentSortKey};
pub use audit::AuditLogRepository;
pub use effectiveness::{EffectivenessRepository, EffectivenessSearch, EffectivenessSortKey};
pub use incident::{IncidentRepository, IncidentSearch, IncidentSortKey};
pub use master::{
    DamageTypeRepository, ShippingCompanyRepository, TroubleTypeRepository, WarehouseRepository,
};
pub use user::UserRepository;
