//! Value types for every persisted table-state slice.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pagination state of the table (0-indexed page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_index: 0,
            page_size: 100,
        }
    }
}

/// One sort rule. The host table honors at most one rule at a time,
/// so sorting state is a `Vec<SortRule>` with zero or one entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub column: String,
    pub descending: bool,
}

impl SortRule {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

pub type Sorting = Vec<SortRule>;

/// A single column's filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
    NumberRange {
        min: Option<f64>,
        max: Option<f64>,
    },
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    MultiSelect(BTreeSet<String>),
}

/// Declared shape of a column's filter, drives decoding of persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Text,
    Number,
    NumberRange,
    DateRange,
    MultiSelect,
}

pub type ColumnFilters = BTreeMap<String, FilterValue>;
pub type ColumnVisibility = BTreeMap<String, bool>;
pub type RowSelection = BTreeMap<String, bool>;

/// Which bucket a persisted slice lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTarget {
    Url,
    Local,
}

impl StorageTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTarget::Url => "url",
            StorageTarget::Local => "localStorage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "url" => Some(StorageTarget::Url),
            "localStorage" => Some(StorageTarget::Local),
            _ => None,
        }
    }
}

/// The host table component's update protocol: either a literal next value
/// or a transform of the previous value.
pub enum Updater<T> {
    Set(T),
    Transform(Box<dyn FnOnce(T) -> T>),
}

impl<T> Updater<T> {
    /// Build a transforming updater without spelling out the box.
    pub fn transform(f: impl FnOnce(T) -> T + 'static) -> Self {
        Updater::Transform(Box::new(f))
    }

    /// Resolve against the value currently rendered by the host.
    pub fn resolve(self, current: T) -> T {
        match self {
            Updater::Set(next) => next,
            Updater::Transform(f) => f(current),
        }
    }
}

impl<T> From<T> for Updater<T> {
    fn from(value: T) -> Self {
        Updater::Set(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_set_ignores_current() {
        let u = Updater::Set(5usize);
        assert_eq!(u.resolve(99), 5);
    }

    #[test]
    fn updater_transform_maps_current() {
        let u = Updater::transform(|p: Pagination| Pagination {
            page_index: p.page_index + 1,
            ..p
        });
        let next = u.resolve(Pagination {
            page_index: 2,
            page_size: 50,
        });
        assert_eq!(next.page_index, 3);
        assert_eq!(next.page_size, 50);
    }

    #[test]
    fn storage_target_string_round_trip() {
        for t in [StorageTarget::Url, StorageTarget::Local] {
            assert_eq!(StorageTarget::from_str(t.as_str()), Some(t));
        }
        assert_eq!(StorageTarget::from_str("session"), None);
    }
}
