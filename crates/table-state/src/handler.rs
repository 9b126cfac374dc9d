//! Change handlers: resolve an `Updater` against the value the host is
//! currently rendering, encode the result and patch the slice's bucket.
//!
//! The current value is passed in explicitly instead of being read back from
//! the bucket, so rapid successive updates never act on a stale snapshot.
//! Bucket write failures propagate to the caller; updater bugs are not
//! caught either.

use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;

use crate::bucket::Bucket;
use crate::codec::{
    encode_bool_map, encode_column_filters, encode_global_filter, encode_pagination,
    encode_sorting, PaginationKeys, SortingKeys,
};
use crate::config::FilterColumn;
use crate::model::{ColumnFilters, Pagination, Sorting, Updater};

#[derive(Clone)]
pub struct PaginationHandler {
    bucket: Rc<dyn Bucket>,
    keys: PaginationKeys,
}

impl PaginationHandler {
    pub(crate) fn new(bucket: Rc<dyn Bucket>, keys: PaginationKeys) -> Self {
        Self { bucket, keys }
    }

    pub fn apply(&self, updater: Updater<Pagination>, current: Pagination) -> Result<Pagination> {
        let next = updater.resolve(current);
        self.bucket.patch(encode_pagination(&next, &self.keys))?;
        Ok(next)
    }

    /// First page, size preserved. Rides the exact same persistence path as
    /// a manual page change.
    pub fn reset_page(&self, current: Pagination) -> Result<Pagination> {
        self.apply(
            Updater::transform(|p: Pagination| Pagination {
                page_index: 0,
                ..p
            }),
            current,
        )
    }
}

#[derive(Clone)]
pub struct SortingHandler {
    bucket: Rc<dyn Bucket>,
    keys: SortingKeys,
}

impl SortingHandler {
    pub(crate) fn new(bucket: Rc<dyn Bucket>, keys: SortingKeys) -> Self {
        Self { bucket, keys }
    }

    pub fn apply(&self, updater: Updater<Sorting>, current: Sorting) -> Result<Sorting> {
        let next = updater.resolve(current);
        self.bucket.patch(encode_sorting(&next, &self.keys))?;
        Ok(next)
    }
}

/// Result of a filter change: the new filter value plus the pagination value
/// produced by the routed page reset, when pagination persists.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChange<T> {
    pub value: T,
    pub pagination: Option<Pagination>,
}

#[derive(Clone)]
pub struct ColumnFiltersHandler {
    bucket: Rc<dyn Bucket>,
    columns: Rc<Vec<FilterColumn>>,
    pagination: Option<PaginationHandler>,
}

impl ColumnFiltersHandler {
    pub(crate) fn new(
        bucket: Rc<dyn Bucket>,
        columns: Rc<Vec<FilterColumn>>,
        pagination: Option<PaginationHandler>,
    ) -> Self {
        Self {
            bucket,
            columns,
            pagination,
        }
    }

    /// Patch the filters, then route the page reset through the pagination
    /// handler. `current_pagination` is the pagination value the host is
    /// rendering right now.
    pub fn apply(
        &self,
        updater: Updater<ColumnFilters>,
        current: ColumnFilters,
        current_pagination: Pagination,
    ) -> Result<FilterChange<ColumnFilters>> {
        let next = updater.resolve(current);
        self.bucket
            .patch(encode_column_filters(&next, &self.columns))?;
        let pagination = match &self.pagination {
            Some(handler) => Some(handler.reset_page(current_pagination)?),
            None => None,
        };
        Ok(FilterChange {
            value: next,
            pagination,
        })
    }
}

#[derive(Clone)]
pub struct GlobalFilterHandler {
    bucket: Rc<dyn Bucket>,
    key: String,
    pagination: Option<PaginationHandler>,
}

impl GlobalFilterHandler {
    pub(crate) fn new(
        bucket: Rc<dyn Bucket>,
        key: String,
        pagination: Option<PaginationHandler>,
    ) -> Self {
        Self {
            bucket,
            key,
            pagination,
        }
    }

    pub fn apply(
        &self,
        updater: Updater<String>,
        current: String,
        current_pagination: Pagination,
    ) -> Result<FilterChange<String>> {
        let next = updater.resolve(current);
        self.bucket.patch(encode_global_filter(&next, &self.key))?;
        let pagination = match &self.pagination {
            Some(handler) => Some(handler.reset_page(current_pagination)?),
            None => None,
        };
        Ok(FilterChange {
            value: next,
            pagination,
        })
    }
}

/// ColumnVisibility and RowSelection share one shape and one handler.
#[derive(Clone)]
pub struct BoolMapHandler {
    bucket: Rc<dyn Bucket>,
    key: String,
}

impl BoolMapHandler {
    pub(crate) fn new(bucket: Rc<dyn Bucket>, key: String) -> Self {
        Self { bucket, key }
    }

    pub fn apply(
        &self,
        updater: Updater<BTreeMap<String, bool>>,
        current: BTreeMap<String, bool>,
    ) -> Result<BTreeMap<String, bool>> {
        let next = updater.resolve(current);
        self.bucket.patch(encode_bool_map(&next, &self.key))?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::MemoryBucket;
    use crate::codec::SELECTION_KEY;
    use crate::model::{FilterKind, FilterValue};
    use serde_json::json;

    fn bucket() -> Rc<MemoryBucket> {
        Rc::new(MemoryBucket::new())
    }

    #[test]
    fn apply_writes_resolved_value_to_bucket() {
        let b = bucket();
        let handler = PaginationHandler::new(b.clone(), PaginationKeys::from_config(None));
        handler
            .apply(
                Updater::Set(Pagination {
                    page_index: 2,
                    page_size: 50,
                }),
                Pagination::default(),
            )
            .unwrap();
        let snap = b.get();
        assert_eq!(snap.get("page"), Some(&json!(2)));
        assert_eq!(snap.get("size"), Some(&json!(50)));
    }

    #[test]
    fn transform_updater_sees_the_passed_current_value() {
        let b = bucket();
        let handler = PaginationHandler::new(b.clone(), PaginationKeys::from_config(None));
        let next = handler
            .apply(
                Updater::transform(|p: Pagination| Pagination {
                    page_index: p.page_index + 1,
                    ..p
                }),
                Pagination {
                    page_index: 4,
                    page_size: 20,
                },
            )
            .unwrap();
        assert_eq!(next.page_index, 5);
        assert_eq!(b.get().get("page"), Some(&json!(5)));
    }

    #[test]
    fn applying_same_change_twice_is_idempotent() {
        let b = bucket();
        let handler = BoolMapHandler::new(b.clone(), SELECTION_KEY.to_string());
        let selection = BTreeMap::from([("3".to_string(), true)]);
        handler
            .apply(Updater::Set(selection.clone()), selection.clone())
            .unwrap();
        let first = b.get();
        handler
            .apply(Updater::Set(selection.clone()), selection)
            .unwrap();
        assert_eq!(b.get(), first);
    }

    #[test]
    fn filter_change_resets_page_index_only() {
        let b = bucket();
        let pagination = PaginationHandler::new(b.clone(), PaginationKeys::from_config(None));
        let columns = Rc::new(vec![FilterColumn::new("age", FilterKind::Text)]);
        let handler = ColumnFiltersHandler::new(b.clone(), columns, Some(pagination));

        let change = handler
            .apply(
                Updater::Set(ColumnFilters::from([(
                    "age".to_string(),
                    FilterValue::Text("25".to_string()),
                )])),
                ColumnFilters::new(),
                Pagination {
                    page_index: 7,
                    page_size: 200,
                },
            )
            .unwrap();

        assert_eq!(
            change.pagination,
            Some(Pagination {
                page_index: 0,
                page_size: 200
            })
        );
        let snap = b.get();
        assert_eq!(snap.get("age"), Some(&json!("25")));
        assert_eq!(snap.get("page"), Some(&json!(0)));
        assert_eq!(snap.get("size"), Some(&json!(200)));
    }

    #[test]
    fn filter_change_without_persisted_pagination_skips_reset() {
        let b = bucket();
        let handler = GlobalFilterHandler::new(b.clone(), "search".to_string(), None);
        let change = handler
            .apply(
                Updater::Set("abc".to_string()),
                String::new(),
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(change.pagination, None);
        assert!(!b.get().contains_key("page"));
    }

    #[test]
    fn clearing_global_filter_removes_its_key() {
        let b = bucket();
        let handler = GlobalFilterHandler::new(b.clone(), "search".to_string(), None);
        handler
            .apply(
                Updater::Set("abc".to_string()),
                String::new(),
                Pagination::default(),
            )
            .unwrap();
        assert!(b.get().contains_key("search"));
        handler
            .apply(
                Updater::Set(String::new()),
                "abc".to_string(),
                Pagination::default(),
            )
            .unwrap();
        assert!(!b.get().contains_key("search"));
    }

    #[test]
    fn rapid_updates_each_see_the_latest_value() {
        let b = bucket();
        let handler = GlobalFilterHandler::new(b.clone(), "search".to_string(), None);
        let mut current = String::new();
        for ch in ["a", "ab", "abc"] {
            current = handler
                .apply(Updater::Set(ch.to_string()), current, Pagination::default())
                .unwrap()
                .value;
        }
        assert_eq!(b.get().get("search"), Some(&json!("abc")));
    }
}
