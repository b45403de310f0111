//! Core traits defined in `tickethub-core` and implemented by other crates.

pub mod entity;
pub mod repository;

pub use entity::{Entity, EntityId, EntityMeta, KeySlot, Loaded, Pending, Relation, RelationKind};
pub use repository::Repository;
