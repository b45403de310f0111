//! Generic repository trait for entity access.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::traits::entity::{Entity, EntityId, Loaded, Pending};
use crate::types::filter::Filter;
use crate::types::pagination::{PageRequest, PagedResult};
use crate::types::sorting::Sort;

/// Generic CRUD and query repository over one entity type.
///
/// Reads go to the store immediately. Writes are staged and become durable
/// only when the owning unit of work saves its changes. Entity-specific
/// query methods are defined on the concrete repository types.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Find an entity by identity. `None` when it does not exist.
    async fn get_by_id(&self, id: EntityId) -> AppResult<Option<T>>;

    /// Every stored entity, in identity order.
    async fn get_all(&self) -> AppResult<Vec<T>>;

    /// Stage an insert. The identity is assigned when changes are saved.
    async fn add(&self, entity: T) -> AppResult<Pending<T>>;

    /// Stage an update guarded by the entity's version.
    ///
    /// Saving fails with `NotFound` when the identity is unknown and with
    /// `ConcurrencyConflict` when the stored version has moved on. Once
    /// saved, the handle carries the bumped version for the next update.
    async fn update(&self, entity: T) -> AppResult<Pending<T>>;

    /// Stage removal of a stored entity; saving fails if it is gone.
    async fn delete(&self, entity: &T) -> AppResult<()>;

    /// Stage removal by identity; a missing row is a no-op when saved.
    async fn delete_by_id(&self, id: EntityId) -> AppResult<()>;

    /// Entities satisfying the filter, in identity order.
    async fn find(&self, filter: &Filter<T>) -> AppResult<Vec<T>>;

    /// The lowest-identity entity satisfying the filter.
    async fn first_or_default(&self, filter: &Filter<T>) -> AppResult<Option<T>>;

    /// Whether any entity satisfies the filter.
    async fn any(&self, filter: &Filter<T>) -> AppResult<bool>;

    /// Number of entities satisfying the filter.
    async fn count(&self, filter: &Filter<T>) -> AppResult<u64>;

    /// Filter, count, order, and slice one page.
    async fn get_paged(
        &self,
        filter: Option<&Filter<T>>,
        sort: Option<&Sort<T>>,
        page: &PageRequest,
    ) -> AppResult<PagedResult<T>>;

    /// Find an entity and eager-load the named relations.
    async fn get_by_id_with_include(
        &self,
        id: EntityId,
        relations: &[&str],
    ) -> AppResult<Option<Loaded<T>>>;

    /// Every entity with the named relations eager-loaded in batch.
    async fn get_all_with_include(&self, relations: &[&str]) -> AppResult<Vec<Loaded<T>>>;
}
