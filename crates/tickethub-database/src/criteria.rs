//! Search criteria shared by the per-entity search operations.

use serde::{Deserialize, Serialize};

use tickethub_core::result::AppResult;
use tickethub_core::traits::Entity;
use tickethub_core::types::filter::Filter;
use tickethub_core::types::pagination::{DEFAULT_PAGE_SIZE, PageRequest};
use tickethub_core::types::sorting::{Sort, SortKey};

/// Paging and ordering fields carried by every criteria object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Requested sort field; unknown names fall back to the entity default.
    #[serde(default)]
    pub sort_by: Option<String>,
    /// Ascending when `true`, descending otherwise.
    #[serde(default)]
    pub ascending: bool,
    /// 1-based page number.
    #[serde(default = "first_page")]
    pub page: u64,
    /// Rows per page.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn first_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            sort_by: None,
            ascending: false,
            page: first_page(),
            page_size: default_page_size(),
        }
    }
}

impl Paging {
    /// Page `page` of `page_size` rows, default ordering.
    pub fn page(page: u64, page_size: u64) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    /// Set the sort field and direction.
    pub fn sorted_by(mut self, sort_by: impl Into<String>, ascending: bool) -> Self {
        self.sort_by = Some(sort_by.into());
        self.ascending = ascending;
        self
    }
}

/// A criteria object that can be turned into a filter, an ordering, and a
/// page request.
pub trait SearchCriteria<T: Entity>: Send + Sync {
    /// Lookup table used to resolve `sort_by`.
    type SortKey: SortKey<T>;

    /// One predicate per populated field, AND-combined.
    fn filter(&self) -> Filter<T>;

    /// Paging and ordering fields.
    fn paging(&self) -> &Paging;

    /// The resolved ordering.
    fn sort(&self) -> Sort<T> {
        let paging = self.paging();
        Sort::resolve::<Self::SortKey>(paging.sort_by.as_deref(), paging.ascending)
    }

    /// The validated page request.
    fn page_request(&self, max_page_size: u64) -> AppResult<PageRequest> {
        let paging = self.paging();
        PageRequest::bounded(paging.page, paging.page_size, max_page_size)
    }
}
