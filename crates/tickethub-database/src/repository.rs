//! Generic repository over any [`Entity`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tickethub_core::error::AppError;
use tickethub_core::result::AppResult;
use tickethub_core::traits::{Entity, EntityId, Loaded, Pending, Repository};
use tickethub_core::types::filter::Filter;
use tickethub_core::types::pagination::{PageRequest, PagedResult};
use tickethub_core::types::sorting::Sort;

use crate::criteria::SearchCriteria;
use crate::include;
use crate::session::{Change, Session};
use crate::store::Row;

/// The repository for entity type `T`, bound to one unit of work.
///
/// Entity-specific queries live in inherent impls on
/// `EntityRepository<Incident>` and friends under [`crate::repositories`].
pub struct EntityRepository<T> {
    session: Arc<Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for EntityRepository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRepository")
            .field("entity", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Entity> EntityRepository<T> {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            _entity: PhantomData,
        }
    }

    /// Entities matching `criteria`, ordered and paged as it requests.
    pub async fn search<C: SearchCriteria<T>>(&self, criteria: &C) -> AppResult<PagedResult<T>> {
        let page = criteria.page_request(self.session.max_page_size())?;
        let filter = criteria.filter();
        let sort = criteria.sort();
        self.get_paged(Some(&filter), Some(&sort), &page).await
    }

    /// Entities for a set of identities in one store read, in identity
    /// order. Unknown ids are skipped.
    pub async fn get_many(&self, ids: &[EntityId]) -> AppResult<Vec<T>> {
        self.session
            .fetch_many(T::TABLE, ids)
            .await?
            .into_iter()
            .map(Row::decode)
            .collect()
    }

    async fn load_all(&self) -> AppResult<Vec<T>> {
        self.session
            .scan(T::TABLE)
            .await?
            .into_iter()
            .map(Row::decode)
            .collect()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for EntityRepository<T> {
    async fn get_by_id(&self, id: EntityId) -> AppResult<Option<T>> {
        self.session
            .fetch(T::TABLE, id)
            .await?
            .map(Row::decode)
            .transpose()
    }

    async fn get_all(&self) -> AppResult<Vec<T>> {
        self.load_all().await
    }

    async fn add(&self, entity: T) -> AppResult<Pending<T>> {
        if !entity.meta().is_transient() {
            return Err(AppError::validation(format!(
                "{}/{} is already persisted",
                T::TABLE,
                entity.id()
            )));
        }
        let payload = Row::encode(&entity)?;
        let (pending, slot) = Pending::stage(entity);
        self.session
            .stage(Change::Insert {
                table: T::TABLE,
                payload,
                slot,
            })
            .await?;
        Ok(pending)
    }

    async fn update(&self, mut entity: T) -> AppResult<Pending<T>> {
        entity.meta_mut().touch();
        let payload = Row::encode(&entity)?;
        let id = entity.id();
        let expected_version = entity.version();
        let (pending, slot) = Pending::stage(entity);
        self.session
            .stage(Change::Update {
                table: T::TABLE,
                id,
                expected_version,
                payload,
                slot,
            })
            .await?;
        Ok(pending)
    }

    async fn delete(&self, entity: &T) -> AppResult<()> {
        self.session
            .stage(Change::Delete {
                table: T::TABLE,
                id: entity.id(),
                required: true,
            })
            .await
    }

    async fn delete_by_id(&self, id: EntityId) -> AppResult<()> {
        self.session
            .stage(Change::Delete {
                table: T::TABLE,
                id,
                required: false,
            })
            .await
    }

    async fn find(&self, filter: &Filter<T>) -> AppResult<Vec<T>> {
        Ok(filter.apply(self.load_all().await?))
    }

    async fn first_or_default(&self, filter: &Filter<T>) -> AppResult<Option<T>> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|entity| filter.matches(entity)))
    }

    async fn any(&self, filter: &Filter<T>) -> AppResult<bool> {
        Ok(self.load_all().await?.iter().any(|e| filter.matches(e)))
    }

    async fn count(&self, filter: &Filter<T>) -> AppResult<u64> {
        let all = self.load_all().await?;
        Ok(all.iter().filter(|e| filter.matches(e)).count() as u64)
    }

    async fn get_paged(
        &self,
        filter: Option<&Filter<T>>,
        sort: Option<&Sort<T>>,
        page: &PageRequest,
    ) -> AppResult<PagedResult<T>> {
        let result = page.paginate(self.load_all().await?, filter, sort);
        debug!(
            table = T::TABLE,
            page = result.page,
            page_size = result.page_size,
            total_count = result.total_count,
            sort = sort.map(Sort::name),
            "Paged query"
        );
        Ok(result)
    }

    async fn get_by_id_with_include(
        &self,
        id: EntityId,
        relations: &[&str],
    ) -> AppResult<Option<Loaded<T>>> {
        include::resolve_relations::<T>(relations)?;
        match self.get_by_id(id).await? {
            Some(entity) => Ok(include::load(&self.session, vec![entity], relations)
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    async fn get_all_with_include(&self, relations: &[&str]) -> AppResult<Vec<Loaded<T>>> {
        include::resolve_relations::<T>(relations)?;
        let items = self.load_all().await?;
        include::load(&self.session, items, relations).await
    }
}
