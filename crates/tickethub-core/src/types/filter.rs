//! Predicate composition for dynamic queries.
//!
//! A [`Filter`] accumulates independent boolean predicates and matches an
//! entity only when every one of them holds. Search criteria add one
//! predicate per populated field; unpopulated fields add nothing, so an
//! empty criteria object matches everything.

use std::fmt;
use std::sync::Arc;

/// A boolean test over an entity.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// An AND-combination of predicates over `T`.
pub struct Filter<T> {
    predicates: Vec<Predicate<T>>,
}

impl<T> Clone for Filter<T> {
    fn clone(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
        }
    }
}

impl<T> Default for Filter<T> {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }
}

impl<T> fmt::Debug for Filter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl<T: 'static> Filter<T> {
    /// A filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter with a single predicate.
    pub fn matching(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self::new().and(predicate)
    }

    /// Add a predicate.
    pub fn and(mut self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Add every predicate of another filter.
    pub fn and_filter(mut self, other: Filter<T>) -> Self {
        self.predicates.extend(other.predicates);
        self
    }

    /// Add a predicate only when `value` is populated.
    pub fn when<V>(
        self,
        value: Option<V>,
        predicate: impl Fn(&T, &V) -> bool + Send + Sync + 'static,
    ) -> Self
    where
        V: Send + Sync + 'static,
    {
        match value {
            Some(value) => self.and(move |entity| predicate(entity, &value)),
            None => self,
        }
    }

    /// Exact match on a field, when `value` is populated.
    pub fn eq<V>(self, value: Option<V>, field: impl Fn(&T) -> V + Send + Sync + 'static) -> Self
    where
        V: PartialEq + Send + Sync + 'static,
    {
        self.when(value, move |entity, expected| field(entity) == *expected)
    }

    /// Exact match on an optional field; entities without a value never match.
    pub fn eq_opt<V>(
        self,
        value: Option<V>,
        field: impl Fn(&T) -> Option<V> + Send + Sync + 'static,
    ) -> Self
    where
        V: PartialEq + Send + Sync + 'static,
    {
        self.when(value, move |entity, expected| {
            field(entity).is_some_and(|actual| actual == *expected)
        })
    }

    /// Case-insensitive substring match. Blank needles are ignored.
    pub fn contains(
        self,
        needle: Option<&str>,
        field: impl Fn(&T) -> &str + Send + Sync + 'static,
    ) -> Self {
        self.when(normalize_needle(needle), move |entity, needle| {
            contains_ci(field(entity), needle)
        })
    }

    /// Inclusive range on a field. Either bound may be absent.
    pub fn range<V>(
        self,
        from: Option<V>,
        to: Option<V>,
        field: impl Fn(&T) -> V + Send + Sync + 'static,
    ) -> Self
    where
        V: PartialOrd + Send + Sync + 'static,
    {
        if from.is_none() && to.is_none() {
            return self;
        }
        self.and(move |entity| in_range(&field(entity), from.as_ref(), to.as_ref()))
    }

    /// Inclusive range on an optional field; entities without a value never match.
    pub fn range_opt<V>(
        self,
        from: Option<V>,
        to: Option<V>,
        field: impl Fn(&T) -> Option<V> + Send + Sync + 'static,
    ) -> Self
    where
        V: PartialOrd + Send + Sync + 'static,
    {
        if from.is_none() && to.is_none() {
            return self;
        }
        self.and(move |entity| {
            field(entity).is_some_and(|value| in_range(&value, from.as_ref(), to.as_ref()))
        })
    }

    /// Whether the entity satisfies every predicate.
    pub fn matches(&self, entity: &T) -> bool {
        self.predicates.iter().all(|predicate| predicate(entity))
    }

    /// Keep only the entities that satisfy every predicate.
    pub fn apply(&self, mut items: Vec<T>) -> Vec<T> {
        if !self.predicates.is_empty() {
            items.retain(|item| self.matches(item));
        }
        items
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Lowercase and trim a text filter; `None` when blank.
pub fn normalize_needle(needle: Option<&str>) -> Option<String> {
    needle
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_lowercase)
}

/// Case-insensitive substring test against an already lowercased needle.
pub fn contains_ci(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}

fn in_range<V: PartialOrd>(value: &V, from: Option<&V>, to: Option<&V>) -> bool {
    from.is_none_or(|from| value >= from) && to.is_none_or(|to| value <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        name: String,
        score: i32,
        closed: Option<i32>,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { id: 1, name: "Crushed pallet".into(), score: 10, closed: Some(3) },
            Row { id: 2, name: "Wet carton".into(), score: 20, closed: None },
            Row { id: 3, name: "crushed box".into(), score: 30, closed: Some(7) },
        ]
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::<Row>::new()
            .eq(None::<i64>, |r| r.id)
            .contains(Some("   "), |r| r.name.as_str())
            .range(None::<i32>, None, |r| r.score);
        assert!(filter.is_empty());
        assert_eq!(filter.apply(rows()).len(), 3);
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let filter = Filter::new().contains(Some("CRUSHED"), |r: &Row| r.name.as_str());
        assert_eq!(ids(&filter.apply(rows())), vec![1, 3]);
    }

    #[test]
    fn test_populated_fields_are_and_combined() {
        let filter = Filter::new()
            .contains(Some("crushed"), |r: &Row| r.name.as_str())
            .range(Some(20), None, |r: &Row| r.score);
        assert_eq!(filter.len(), 2);
        assert_eq!(ids(&filter.apply(rows())), vec![3]);
    }

    #[test]
    fn test_range_is_inclusive_and_open_ended() {
        let both = Filter::new().range(Some(10), Some(20), |r: &Row| r.score);
        assert_eq!(ids(&both.apply(rows())), vec![1, 2]);

        let upper = Filter::new().range(None, Some(20), |r: &Row| r.score);
        assert_eq!(ids(&upper.apply(rows())), vec![1, 2]);

        let lower = Filter::new().range(Some(30), None, |r: &Row| r.score);
        assert_eq!(ids(&lower.apply(rows())), vec![3]);
    }

    #[test]
    fn test_optional_fields_without_value_never_match() {
        let eq = Filter::new().eq_opt(Some(3), |r: &Row| r.closed);
        assert_eq!(ids(&eq.apply(rows())), vec![1]);

        let range = Filter::new().range_opt(Some(0), None, |r: &Row| r.closed);
        assert_eq!(ids(&range.apply(rows())), vec![1, 3]);
    }
}
