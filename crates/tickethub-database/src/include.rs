//! Batched eager loading of named relations.
//!
//! Each requested relation costs one store read regardless of how many
//! owners are loaded: `BelongsTo` relations fetch the distinct referenced
//! ids in one call, `HasMany` relations scan the target table once and
//! group rows by their foreign key.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, Loaded, Relation, RelationKind};

use crate::store::Row;
use crate::session::Session;

/// Resolve relation names for `T`, rejecting unknown ones.
pub fn resolve_relations<T: Entity>(names: &[&str]) -> AppResult<Vec<&'static Relation>> {
    names
        .iter()
        .map(|name| {
            T::relation(name).ok_or_else(|| {
                AppError::validation(format!("unknown relation '{name}' for {}", T::TABLE))
            })
        })
        .collect()
}

/// Wrap `items` and load the named relations for all of them.
pub(crate) async fn load<T: Entity>(
    session: &Session,
    items: Vec<T>,
    names: &[&str],
) -> AppResult<Vec<Loaded<T>>> {
    let relations = resolve_relations::<T>(names)?;
    let mut loaded: Vec<Loaded<T>> = items.into_iter().map(Loaded::new).collect();
    if loaded.is_empty() {
        return Ok(loaded);
    }

    for relation in relations {
        match relation.kind {
            RelationKind::BelongsTo => belongs_to(session, &mut loaded, relation).await?,
            RelationKind::HasMany => has_many(session, &mut loaded, relation).await?,
        }
        debug!(
            table = T::TABLE,
            relation = relation.name,
            owners = loaded.len(),
            "Relation loaded"
        );
    }
    Ok(loaded)
}

fn foreign_key<T: Entity>(entity: &T, field: &str) -> AppResult<Option<EntityId>> {
    let encoded = serde_json::to_value(entity)?;
    Ok(encoded.get(field).and_then(Value::as_i64))
}

async fn belongs_to<T: Entity>(
    session: &Session,
    loaded: &mut [Loaded<T>],
    relation: &'static Relation,
) -> AppResult<()> {
    let keys = loaded
        .iter()
        .map(|item| foreign_key(&item.entity, relation.foreign_key))
        .collect::<AppResult<Vec<_>>>()?;
    let wanted: Vec<EntityId> = keys
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let targets: HashMap<EntityId, Value> = session
        .fetch_many(relation.target, &wanted)
        .await?
        .into_iter()
        .map(|row| (row.id, row.into_json()))
        .collect();

    for (item, key) in loaded.iter_mut().zip(keys) {
        let related = key
            .and_then(|id| targets.get(&id).cloned())
            .into_iter()
            .collect();
        item.related.insert(relation.name, related);
    }
    Ok(())
}

async fn has_many<T: Entity>(
    session: &Session,
    loaded: &mut [Loaded<T>],
    relation: &'static Relation,
) -> AppResult<()> {
    let owners: HashSet<EntityId> = loaded.iter().map(|item| item.entity.id()).collect();
    let mut grouped: HashMap<EntityId, Vec<Value>> = HashMap::new();
    for row in session.scan(relation.target).await? {
        if let Some(owner) = row.field_id(relation.foreign_key).filter(|id| owners.contains(id)) {
            grouped.entry(owner).or_default().push(Row::into_json(row));
        }
    }

    for item in loaded.iter_mut() {
        let related = grouped.get(&item.entity.id()).cloned().unwrap_or_default();
        item.related.insert(relation.name, related);
    }
    Ok(())
}
