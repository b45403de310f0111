//! Pagination types and the paging engine shared by every search.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::Entity;
use crate::types::filter::Filter;
use crate::types::sorting::Sort;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// A validated page request.
///
/// `page` is 1-based; a requested page of `0` is treated as the first
/// page. A `page_size` of `0` is a caller error and is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
}

impl PageRequest {
    /// Validate paging input.
    pub fn new(page: u64, page_size: u64) -> AppResult<Self> {
        if page_size == 0 {
            return Err(AppError::validation("page_size must be greater than zero"));
        }
        Ok(Self {
            page: page.max(1),
            page_size,
        })
    }

    /// Validate paging input against an upper bound on the page size.
    pub fn bounded(page: u64, page_size: u64, max_page_size: u64) -> AppResult<Self> {
        if page_size > max_page_size {
            return Err(AppError::validation(format!(
                "page_size {page_size} exceeds the maximum of {max_page_size}"
            )));
        }
        Self::new(page, page_size)
    }

    /// Number of rows skipped before this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Number of rows taken for this page.
    pub fn limit(&self) -> u64 {
        self.page_size
    }

    /// Filter, count, order, then slice `items`.
    ///
    /// `total_count` is taken after filtering and before slicing. Ordering
    /// always ends with identity ascending, so rows tied on the sort key
    /// (or all rows, when no sort is given) keep a stable position across
    /// pages.
    pub fn paginate<T: Entity>(
        &self,
        items: Vec<T>,
        filter: Option<&Filter<T>>,
        sort: Option<&Sort<T>>,
    ) -> PagedResult<T> {
        let mut items = match filter {
            Some(filter) => filter.apply(items),
            None => items,
        };
        let total_count = items.len() as u64;

        items.sort_by(|a, b| {
            let primary = sort.map_or(std::cmp::Ordering::Equal, |s| s.compare(a, b));
            primary.then_with(|| a.id().cmp(&b.id()))
        });

        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        let page: Vec<T> = items.into_iter().skip(skip).take(take).collect();

        PagedResult::new(page, self.page, self.page_size, total_count)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a filtered, ordered result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Number of items matching the filter, ignoring paging.
    pub total_count: u64,
    /// Current page number (1-based).
    pub page: u64,
    /// Number of items per page.
    pub page_size: u64,
    /// Total number of pages; `0` when nothing matched.
    pub total_pages: u64,
    /// Whether a page precedes this one.
    pub has_previous_page: bool,
    /// Whether a page follows this one.
    pub has_next_page: bool,
}

impl<T> PagedResult<T> {
    /// Build a page and derive its metadata.
    pub fn new(items: Vec<T>, page: u64, page_size: u64, total_count: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_count.div_ceil(page_size)
        };
        Self {
            items,
            total_count,
            page,
            page_size,
            total_pages,
            has_previous_page: page > 1,
            has_next_page: page < total_pages,
        }
    }

    /// An empty page.
    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), request.page, request.page_size, 0)
    }

    /// Map the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
        }
    }

    /// Split into `(items, total_count)`.
    pub fn into_parts(self) -> (Vec<T>, u64) {
        (self.items, self.total_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::traits::entity::EntityMeta;
    use crate::types::sorting::{SortDirection, SortValue};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Parcel {
        #[serde(flatten)]
        meta: EntityMeta,
        weight: i64,
    }

    impl Entity for Parcel {
        const TABLE: &'static str = "parcels";

        fn meta(&self) -> &EntityMeta {
            &self.meta
        }

        fn meta_mut(&mut self) -> &mut EntityMeta {
            &mut self.meta
        }
    }

    fn parcels(count: i64, weight: impl Fn(i64) -> i64) -> Vec<Parcel> {
        // Inserted in reverse so that input order never explains the output.
        (1..=count)
            .rev()
            .map(|id| Parcel {
                meta: EntityMeta {
                    id,
                    ..EntityMeta::new()
                },
                weight: weight(id),
            })
            .collect()
    }

    fn ids(items: &[Parcel]) -> Vec<i64> {
        items.iter().map(|p| p.meta.id).collect()
    }

    #[test]
    fn test_page_zero_is_first_page() {
        let request = PageRequest::new(0, 10).expect("valid");
        assert_eq!(request.page, 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let err = PageRequest::new(1, 0).expect_err("invalid");
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_bounded_rejects_oversized_pages() {
        assert!(PageRequest::bounded(1, 100, 100).is_ok());
        let err = PageRequest::bounded(1, 101, 100).expect_err("too large");
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_metadata_arithmetic() {
        let result = PagedResult::new(vec![(); 5], 3, 10, 25);
        assert_eq!(result.total_pages, 3);
        assert!(result.has_previous_page);
        assert!(!result.has_next_page);

        let first = PagedResult::new(vec![(); 10], 1, 10, 25);
        assert!(!first.has_previous_page);
        assert!(first.has_next_page);
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let result = PagedResult::<()>::empty(&PageRequest::default());
        assert_eq!(result.total_pages, 0);
        assert!(!result.has_next_page);
        assert!(!result.has_previous_page);
    }

    #[test]
    fn test_item_count_matches_formula() {
        for page in 1..=4 {
            for page_size in [1_u64, 3, 7, 10, 30] {
                let request = PageRequest::new(page, page_size).expect("valid");
                let result = request.paginate(parcels(25, |id| id), None, None);
                let skip = (page - 1) * page_size;
                let expected = page_size.min(25_u64.saturating_sub(skip));
                assert_eq!(result.items.len() as u64, expected);
                assert_eq!(result.total_count, 25);
            }
        }
    }

    #[test]
    fn test_page_past_end_is_empty_with_total() {
        let request = PageRequest::new(9, 10).expect("valid");
        let result = request.paginate(parcels(25, |id| id), None, None);
        assert!(result.items.is_empty());
        assert_eq!(result.total_count, 25);
        assert_eq!(result.total_pages, 3);
    }

    #[test]
    fn test_total_counts_filtered_rows_only() {
        let filter = Filter::matching(|p: &Parcel| p.weight % 2 == 0);
        for page in 1..=3 {
            let request = PageRequest::new(page, 4).expect("valid");
            let result = request.paginate(parcels(25, |id| id), Some(&filter), None);
            assert_eq!(result.total_count, 12);
            assert!(result.items.iter().all(|p| p.weight % 2 == 0));
        }
    }

    #[test]
    fn test_ties_are_broken_by_identity() {
        // Every row shares the same sort key.
        let sort = Sort::by("weight", SortDirection::Desc, |p: &Parcel| {
            SortValue::from(p.weight)
        });
        let mut seen = Vec::new();
        for page in 1..=3 {
            let request = PageRequest::new(page, 10).expect("valid");
            let result = request.paginate(parcels(25, |_| 5), None, Some(&sort));
            seen.extend(ids(&result.items));
        }
        assert_eq!(seen, (1..=25).collect::<Vec<_>>());
    }

    #[test]
    fn test_sort_direction_applies_before_tiebreak() {
        let sort = Sort::by("weight", SortDirection::Desc, |p: &Parcel| {
            SortValue::from(p.weight)
        });
        let request = PageRequest::new(1, 5).expect("valid");
        let result = request.paginate(parcels(6, |id| id / 2), None, Some(&sort));
        // weights: 1->0, 2->1, 3->1, 4->2, 5->2, 6->3
        assert_eq!(ids(&result.items), vec![6, 4, 5, 2, 3]);
    }
}
