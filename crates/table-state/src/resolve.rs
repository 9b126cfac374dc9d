//! Initial-state resolution: for each slice, pick exactly one of
//! persisted-value-from-the-target-bucket or caller default.
//!
//! Resolution is pure in the two snapshots plus the config, so it is safe
//! to recompute on every bucket change without causing writes.

use crate::bucket::Snapshot;
use crate::codec::{
    decode_bool_map, decode_column_filters, decode_global_filter, decode_page_index,
    decode_page_size, decode_sorting, PaginationKeys, SortingKeys, GLOBAL_FILTER_KEY,
    SELECTION_KEY, VISIBILITY_KEY,
};
use crate::config::{FiltersConfig, SliceConfig, TableStateConfig};
use crate::model::{
    ColumnFilters, ColumnVisibility, Pagination, RowSelection, Sorting, StorageTarget,
};

/// Starting values for every slice; `None` where the slice neither persists
/// a value nor has a caller default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTableState {
    pub pagination: Option<Pagination>,
    pub sorting: Option<Sorting>,
    pub column_filters: Option<ColumnFilters>,
    pub global_filter: Option<String>,
    pub column_visibility: Option<ColumnVisibility>,
    pub row_selection: Option<RowSelection>,
}

fn pick<'a>(
    target: StorageTarget,
    url: &'a Snapshot,
    local: &'a Snapshot,
) -> &'a Snapshot {
    match target {
        StorageTarget::Url => url,
        StorageTarget::Local => local,
    }
}

pub fn resolve_pagination(
    config: &SliceConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&Pagination>,
) -> Option<Pagination> {
    let Some(target) = config.storage else {
        return default.copied();
    };
    let snapshot = pick(target, url, local);
    let keys = PaginationKeys::from_config(config.key.as_deref());
    let index = decode_page_index(snapshot, &keys);
    let size = decode_page_size(snapshot, &keys);
    if index.is_none() && size.is_none() {
        return default.copied();
    }
    let fallback = default.copied().unwrap_or_default();
    Some(Pagination {
        page_index: index.unwrap_or(fallback.page_index),
        page_size: size.unwrap_or(fallback.page_size),
    })
}

pub fn resolve_sorting(
    config: &SliceConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&Sorting>,
) -> Option<Sorting> {
    let Some(target) = config.storage else {
        return default.cloned();
    };
    let keys = SortingKeys::from_config(config.key.as_deref());
    decode_sorting(pick(target, url, local), &keys).or_else(|| default.cloned())
}

pub fn resolve_column_filters(
    config: &FiltersConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&ColumnFilters>,
) -> Option<ColumnFilters> {
    let Some(target) = config.storage else {
        return default.cloned();
    };
    let decoded = decode_column_filters(pick(target, url, local), &config.columns);
    if decoded.is_empty() {
        default.cloned()
    } else {
        Some(decoded)
    }
}

pub fn resolve_global_filter(
    config: &SliceConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&String>,
) -> Option<String> {
    let Some(target) = config.storage else {
        return default.cloned();
    };
    let key = config.key.as_deref().unwrap_or(GLOBAL_FILTER_KEY);
    decode_global_filter(pick(target, url, local), key).or_else(|| default.cloned())
}

/// Shared by ColumnVisibility and RowSelection: the persisted object wins
/// wholesale when it validates, otherwise the default — never a field merge.
fn resolve_bool_map(
    config: &SliceConfig,
    canonical_key: &str,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&std::collections::BTreeMap<String, bool>>,
) -> Option<std::collections::BTreeMap<String, bool>> {
    let Some(target) = config.storage else {
        return default.cloned();
    };
    let key = config.key.as_deref().unwrap_or(canonical_key);
    decode_bool_map(pick(target, url, local), key).or_else(|| default.cloned())
}

pub fn resolve_column_visibility(
    config: &SliceConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&ColumnVisibility>,
) -> Option<ColumnVisibility> {
    resolve_bool_map(config, VISIBILITY_KEY, url, local, default)
}

pub fn resolve_row_selection(
    config: &SliceConfig,
    url: &Snapshot,
    local: &Snapshot,
    default: Option<&RowSelection>,
) -> Option<RowSelection> {
    resolve_bool_map(config, SELECTION_KEY, url, local, default)
}

/// Resolve every slice from one snapshot per bucket, so slices sharing a
/// bucket never observe torn updates relative to each other.
pub fn resolve_all(
    config: &TableStateConfig,
    url: &Snapshot,
    local: &Snapshot,
) -> ResolvedTableState {
    let d = &config.defaults;
    ResolvedTableState {
        pagination: resolve_pagination(&config.pagination, url, local, d.pagination.as_ref()),
        sorting: resolve_sorting(&config.sorting, url, local, d.sorting.as_ref()),
        column_filters: resolve_column_filters(
            &config.column_filters,
            url,
            local,
            d.column_filters.as_ref(),
        ),
        global_filter: resolve_global_filter(
            &config.global_filter,
            url,
            local,
            d.global_filter.as_ref(),
        ),
        column_visibility: resolve_column_visibility(
            &config.column_visibility,
            url,
            local,
            d.column_visibility.as_ref(),
        ),
        row_selection: resolve_row_selection(
            &config.row_selection,
            url,
            local,
            d.row_selection.as_ref(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterColumn;
    use crate::model::{FilterKind, FilterValue, SortRule};
    use serde_json::json;

    fn snap(entries: &[(&str, serde_json::Value)]) -> Snapshot {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn ephemeral_slice_always_resolves_to_default() {
        let url = snap(&[("page", json!(7)), ("size", json!(200))]);
        let default = Pagination {
            page_index: 1,
            page_size: 25,
        };
        let resolved =
            resolve_pagination(&SliceConfig::ephemeral(), &url, &Snapshot::new(), Some(&default));
        assert_eq!(resolved, Some(default));
    }

    #[test]
    fn persisted_value_beats_default() {
        let url = snap(&[("page", json!(3)), ("size", json!(50))]);
        let default = Pagination::default();
        let resolved =
            resolve_pagination(&SliceConfig::url(), &url, &Snapshot::new(), Some(&default));
        assert_eq!(
            resolved,
            Some(Pagination {
                page_index: 3,
                page_size: 50
            })
        );
    }

    #[test]
    fn pagination_reads_only_its_target_bucket() {
        let local = snap(&[("size", json!(20))]);
        // Pagination targets the URL; a value sitting in localStorage is invisible.
        let resolved = resolve_pagination(&SliceConfig::url(), &Snapshot::new(), &local, None);
        assert_eq!(resolved, None);
    }

    #[test]
    fn sorting_resolves_from_its_two_keys() {
        let url = snap(&[("sort-col", json!("age")), ("sort-dir", json!("asc"))]);
        let resolved = resolve_sorting(&SliceConfig::url(), &url, &Snapshot::new(), None);
        assert_eq!(resolved, Some(vec![SortRule::asc("age")]));
    }

    #[test]
    fn url_filter_resolves_as_text() {
        // ?t.age=25 with default {} resolves to {age: "25"}.
        let url = snap(&[("age", json!("25"))]);
        let config = FiltersConfig::url(vec![FilterColumn::new("age", FilterKind::Text)]);
        let default = ColumnFilters::new();
        let resolved = resolve_column_filters(&config, &url, &Snapshot::new(), Some(&default));
        assert_eq!(
            resolved,
            Some(ColumnFilters::from([(
                "age".to_string(),
                FilterValue::Text("25".to_string())
            )]))
        );
    }

    #[test]
    fn visibility_wins_wholesale_over_default() {
        let local = snap(&[("visibility", json!({"email": false}))]);
        let default = ColumnVisibility::from([
            ("email".to_string(), true),
            ("role".to_string(), true),
        ]);
        let resolved = resolve_column_visibility(
            &SliceConfig::local(),
            &Snapshot::new(),
            &local,
            Some(&default),
        );
        // Not merged field-by-field: the persisted object replaces the default.
        assert_eq!(
            resolved,
            Some(ColumnVisibility::from([("email".to_string(), false)]))
        );
    }

    #[test]
    fn falsy_persisted_visibility_falls_back_to_default() {
        // Legacy behavior: a persisted 0 is treated as nothing persisted.
        let local = snap(&[("visibility", json!(0))]);
        let default = ColumnVisibility::from([("email".to_string(), true)]);
        let resolved = resolve_column_visibility(
            &SliceConfig::local(),
            &Snapshot::new(),
            &local,
            Some(&default),
        );
        assert_eq!(resolved, Some(default));
    }

    #[test]
    fn malformed_selection_falls_back_without_panic() {
        let local = snap(&[("selection", json!({"1": true, "2": "yes"}))]);
        let resolved = resolve_row_selection(
            &SliceConfig::local(),
            &Snapshot::new(),
            &local,
            Some(&RowSelection::new()),
        );
        assert_eq!(resolved, Some(RowSelection::new()));
    }

    #[test]
    fn missing_value_without_default_resolves_to_none() {
        let resolved =
            resolve_global_filter(&SliceConfig::url(), &Snapshot::new(), &Snapshot::new(), None);
        assert_eq!(resolved, None);
    }

    #[test]
    fn resolve_is_pure_and_write_free() {
        let url = snap(&[("search", json!("abc"))]);
        let config = SliceConfig::url();
        let a = resolve_global_filter(&config, &url, &Snapshot::new(), None);
        let b = resolve_global_filter(&config, &url, &Snapshot::new(), None);
        assert_eq!(a, b);
        assert_eq!(a, Some("abc".to_string()));
    }
}
