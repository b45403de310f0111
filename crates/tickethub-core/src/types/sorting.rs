//! Sorting types for search queries.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Direction from the `ascending` flag carried by search criteria.
    pub fn from_ascending(ascending: bool) -> Self {
        if ascending { Self::Asc } else { Self::Desc }
    }

    /// Apply this direction to an ascending comparison.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// A comparable projection of one entity field.
///
/// Text is compared case-insensitively. `Null` sorts before every other
/// value so that entities missing an optional field group together.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    /// Missing optional value.
    Null,
    /// Integer or identifier.
    Int(i64),
    /// Floating-point measurement.
    Float(f64),
    /// Lowercased text.
    Text(String),
    /// Timestamp.
    Time(DateTime<Utc>),
}

impl SortValue {
    /// Text value compared without regard to case.
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_lowercase())
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
            Self::Time(_) => 4,
        }
    }

    /// Total ordering across all values.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SortValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<DateTime<Utc>> for SortValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Time(value)
    }
}

impl<V: Into<SortValue>> From<Option<V>> for SortValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A fixed lookup table from `sort_by` strings to entity fields.
///
/// Implemented by a small enum per entity type. Unknown keys resolve to
/// [`SortKey::DEFAULT`] instead of failing.
pub trait SortKey<T>: Copy + Send + Sync + 'static {
    /// The field used when no key, or an unknown key, is supplied.
    const DEFAULT: Self;

    /// Every key, in documentation order.
    const ALL: &'static [Self];

    /// Canonical name of the key.
    fn name(self) -> &'static str;

    /// Project the entity onto the sorted field.
    fn value(self, entity: &T) -> SortValue;

    /// Look up a key by name, ignoring case, `_` and `-`.
    fn parse(key: &str) -> Option<Self> {
        let wanted = canonical(key);
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| canonical(candidate.name()) == wanted)
    }

    /// Look up a key, falling back to [`SortKey::DEFAULT`].
    fn resolve(key: Option<&str>) -> Self {
        match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::parse(key).unwrap_or_else(|| {
                tracing::debug!(
                    sort_by = key,
                    fallback = Self::DEFAULT.name(),
                    "Unknown sort key, using default"
                );
                Self::DEFAULT
            }),
            None => Self::DEFAULT,
        }
    }
}

fn canonical(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// A resolved ordering over `T`.
pub struct Sort<T> {
    name: &'static str,
    accessor: Arc<dyn Fn(&T) -> SortValue + Send + Sync>,
    direction: SortDirection,
}

impl<T> Clone for Sort<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            accessor: Arc::clone(&self.accessor),
            direction: self.direction,
        }
    }
}

impl<T> fmt::Debug for Sort<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sort")
            .field("name", &self.name)
            .field("direction", &self.direction)
            .finish()
    }
}

impl<T: 'static> Sort<T> {
    /// Order by an arbitrary projection.
    pub fn by(
        name: &'static str,
        direction: SortDirection,
        accessor: impl Fn(&T) -> SortValue + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            accessor: Arc::new(accessor),
            direction,
        }
    }

    /// Order by a lookup-table key.
    pub fn key<K: SortKey<T>>(key: K, direction: SortDirection) -> Self {
        Self::by(key.name(), direction, move |entity| key.value(entity))
    }

    /// Resolve a `sort_by` string through the lookup table `K`.
    pub fn resolve<K: SortKey<T>>(sort_by: Option<&str>, ascending: bool) -> Self {
        Self::key(K::resolve(sort_by), SortDirection::from_ascending(ascending))
    }

    /// Canonical name of the sorted field.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Sort direction.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Compare two entities on the sorted field, honouring direction.
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        let ordering = (self.accessor)(a).total_cmp(&(self.accessor)(b));
        self.direction.apply(ordering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum NameKey {
        Name,
        Weight,
    }

    impl SortKey<(String, f64)> for NameKey {
        const DEFAULT: Self = Self::Name;
        const ALL: &'static [Self] = &[Self::Name, Self::Weight];

        fn name(self) -> &'static str {
            match self {
                Self::Name => "name",
                Self::Weight => "total_weight",
            }
        }

        fn value(self, entity: &(String, f64)) -> SortValue {
            match self {
                Self::Name => SortValue::text(&entity.0),
                Self::Weight => entity.1.into(),
            }
        }
    }

    #[test]
    fn test_parse_ignores_case_and_separators() {
        assert_eq!(NameKey::parse("TotalWeight"), Some(NameKey::Weight));
        assert_eq!(NameKey::parse("total-weight"), Some(NameKey::Weight));
        assert_eq!(NameKey::parse("colour"), None);
    }

    #[test]
    fn test_unknown_key_falls_back_to_default() {
        assert_eq!(NameKey::resolve(Some("colour")), NameKey::Name);
        assert_eq!(NameKey::resolve(Some("  ")), NameKey::Name);
        assert_eq!(NameKey::resolve(None), NameKey::Name);
    }

    #[test]
    fn test_text_compares_case_insensitively() {
        let sort = Sort::<(String, f64)>::resolve::<NameKey>(Some("name"), true);
        let a = ("apple".to_string(), 1.0);
        let b = ("Banana".to_string(), 1.0);
        assert_eq!(sort.compare(&a, &b), Ordering::Less);

        let desc = Sort::<(String, f64)>::resolve::<NameKey>(Some("name"), false);
        assert_eq!(desc.compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn test_null_sorts_first() {
        assert_eq!(
            SortValue::Null.total_cmp(&SortValue::from(Some(1_i64))),
            Ordering::Less
        );
        assert_eq!(
            SortValue::from(None::<i64>).total_cmp(&SortValue::Null),
            Ordering::Equal
        );
    }
}
