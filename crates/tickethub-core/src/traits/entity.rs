//! The entity capability shared by every persisted record.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Integer identity assigned by the store on insert.
pub type EntityId = i64;

/// Identity, optimistic-concurrency version, and audit timestamps.
///
/// Every entity embeds one of these with `#[serde(flatten)]`. An `id` of
/// `0` marks an entity that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Store-assigned identity; never reused.
    #[serde(default)]
    pub id: EntityId,
    /// Row version, incremented by the store on every update.
    #[serde(default)]
    pub version: i64,
    /// When the entity was constructed. Never changes afterwards.
    pub created_at: DateTime<Utc>,
    /// When the entity was last mutated. Always `>= created_at`.
    pub updated_at: DateTime<Utc>,
}

impl EntityMeta {
    /// Metadata for a brand-new, not yet persisted entity.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Metadata for a new entity constructed at a fixed instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at` to the current time.
    pub fn touch(&mut self) {
        self.touch_at(Utc::now());
    }

    /// Refresh `updated_at`, never moving it before `created_at`.
    pub fn touch_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = at.max(self.created_at);
    }

    /// Whether the store has not assigned an identity yet.
    pub fn is_transient(&self) -> bool {
        self.id == 0
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// How a related table is joined to the owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The owner holds `foreign_key` pointing at one target row.
    BelongsTo,
    /// Target rows hold `foreign_key` pointing back at the owner.
    HasMany,
}

/// A named, id-based relation that can be eager-loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Name callers pass to the `*_with_include` operations.
    pub name: &'static str,
    /// Table of the related entity.
    pub target: &'static str,
    /// Serialized field name holding the foreign key.
    pub foreign_key: &'static str,
    /// Join direction.
    pub kind: RelationKind,
}

impl Relation {
    /// The owner references one target row through `foreign_key`.
    pub const fn belongs_to(
        name: &'static str,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            foreign_key,
            kind: RelationKind::BelongsTo,
        }
    }

    /// Target rows reference the owner through their `foreign_key`.
    pub const fn has_many(
        name: &'static str,
        target: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            target,
            foreign_key,
            kind: RelationKind::HasMany,
        }
    }
}

/// A persisted record type.
///
/// Implementors are plain data: serializable, cloneable, and free of live
/// references to other entities. Related records are reached only through
/// the foreign-key ids described by [`Entity::RELATIONS`].
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Store table name.
    const TABLE: &'static str;

    /// Relations available to `*_with_include` queries.
    const RELATIONS: &'static [Relation] = &[];

    /// Shared identity and audit fields.
    fn meta(&self) -> &EntityMeta;

    /// Mutable access to the shared identity and audit fields.
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Store-assigned identity (`0` until persisted).
    fn id(&self) -> EntityId {
        self.meta().id
    }

    /// Row version read from the store.
    fn version(&self) -> i64 {
        self.meta().version
    }

    /// Construction timestamp.
    fn created_at(&self) -> DateTime<Utc> {
        self.meta().created_at
    }

    /// Last mutation timestamp.
    fn updated_at(&self) -> DateTime<Utc> {
        self.meta().updated_at
    }

    /// Look up a relation by name, ignoring ASCII case.
    fn relation(name: &str) -> Option<&'static Relation> {
        Self::RELATIONS
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }
}

/// An entity staged by `add` or `update`.
///
/// The identity and version the store wrote are filled in when the change
/// is saved. Inside an explicit transaction they are provisional: a
/// rollback clears them again.
#[derive(Debug, Clone)]
pub struct Pending<T> {
    entity: T,
    key: Arc<Mutex<Option<(EntityId, i64)>>>,
}

/// Write side of a [`Pending`] handle, kept by the unit of work.
#[derive(Debug, Clone)]
pub struct KeySlot(Arc<Mutex<Option<(EntityId, i64)>>>);

impl KeySlot {
    /// Record the identity and version the store wrote.
    pub fn fill(&self, id: EntityId, version: i64) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some((id, version));
    }

    /// Withdraw a provisional identity after its transaction rolled back.
    pub fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<T: Entity> Pending<T> {
    /// Stage an entity and return the handle plus its key slot.
    pub fn stage(entity: T) -> (Self, KeySlot) {
        let key = Arc::new(Mutex::new(None));
        (
            Self {
                entity,
                key: Arc::clone(&key),
            },
            KeySlot(key),
        )
    }

    fn key(&self) -> Option<(EntityId, i64)> {
        *self.key.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The entity as it was staged.
    pub fn entity(&self) -> &T {
        &self.entity
    }

    /// The stored identity, once the change has been saved.
    pub fn id(&self) -> Option<EntityId> {
        self.key().map(|(id, _)| id)
    }

    /// Whether the change has been saved.
    pub fn is_saved(&self) -> bool {
        self.key().is_some()
    }

    /// The entity with its stored identity and version, once saved.
    ///
    /// This is the value to pass to a later `update`.
    pub fn saved(&self) -> Option<T> {
        self.key().map(|(id, version)| {
            let mut entity = self.entity.clone();
            let meta = entity.meta_mut();
            meta.id = id;
            meta.version = version;
            entity
        })
    }
}

/// An entity loaded together with named related records.
///
/// Related records are held as serialized rows and decoded on demand, so
/// one value can carry relations of several entity types.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    /// The primary entity.
    pub entity: T,
    /// Related rows by relation name.
    pub related: BTreeMap<&'static str, Vec<serde_json::Value>>,
}

impl<T> Loaded<T> {
    /// Wrap an entity with no relations loaded yet.
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            related: BTreeMap::new(),
        }
    }

    /// Decode a `BelongsTo` relation. `None` when not loaded or dangling.
    pub fn one<R: Entity>(&self, relation: &str) -> AppResult<Option<R>> {
        match self.rows(relation).first() {
            Some(row) => Ok(Some(serde_json::from_value(row.clone())?)),
            None => Ok(None),
        }
    }

    /// Decode a `HasMany` relation. Empty when not loaded.
    pub fn many<R: Entity>(&self, relation: &str) -> AppResult<Vec<R>> {
        self.rows(relation)
            .iter()
            .map(|row| serde_json::from_value(row.clone()).map_err(Into::into))
            .collect()
    }

    /// Whether the named relation was requested.
    pub fn has(&self, relation: &str) -> bool {
        self.related
            .keys()
            .any(|name| name.eq_ignore_ascii_case(relation))
    }

    fn rows(&self, relation: &str) -> &[serde_json::Value] {
        self.related
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(relation))
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }
}
