//! Mapping between typed slice values and the flat bucket keys they
//! persist under.
//!
//! Key layout per slice (base key defaults in parentheses):
//! - pagination: `page` + `size`
//! - sorting: `<base>-col` + `<base>-dir` (`sort`)
//! - column filters: one key per declared column id
//! - global filter: one key (`search`)
//! - visibility / selection: one key (`visibility` / `selection`)

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::bucket::{Patch, Snapshot};
use crate::config::FilterColumn;
use crate::model::{ColumnFilters, FilterKind, FilterValue, Pagination, SortRule, Sorting};
use crate::validate::{as_bool_map, as_index, as_number, as_text, is_present};

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct PaginationKeys {
    pub page: String,
    pub size: String,
}

impl PaginationKeys {
    pub fn from_config(base: Option<&str>) -> Self {
        match base {
            None => Self {
                page: "page".to_string(),
                size: "size".to_string(),
            },
            Some(base) => Self {
                page: base.to_string(),
                size: format!("{base}-size"),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortingKeys {
    pub col: String,
    pub dir: String,
}

impl SortingKeys {
    pub fn from_config(base: Option<&str>) -> Self {
        let base = base.unwrap_or("sort");
        Self {
            col: format!("{base}-col"),
            dir: format!("{base}-dir"),
        }
    }
}

pub const GLOBAL_FILTER_KEY: &str = "search";
pub const VISIBILITY_KEY: &str = "visibility";
pub const SELECTION_KEY: &str = "selection";

/// A key's value, if it is present under the legacy truthiness rule.
fn present<'a>(snapshot: &'a Snapshot, key: &str) -> Option<&'a Value> {
    snapshot.get(key).filter(|v| is_present(v))
}

// ---- pagination ------------------------------------------------------------

pub fn decode_page_index(snapshot: &Snapshot, keys: &PaginationKeys) -> Option<usize> {
    present(snapshot, &keys.page).and_then(as_index)
}

pub fn decode_page_size(snapshot: &Snapshot, keys: &PaginationKeys) -> Option<usize> {
    present(snapshot, &keys.size).and_then(as_index)
}

pub fn encode_pagination(p: &Pagination, keys: &PaginationKeys) -> Patch {
    vec![
        (keys.page.clone(), Some(json!(p.page_index))),
        (keys.size.clone(), Some(json!(p.page_size))),
    ]
}

// ---- sorting ---------------------------------------------------------------

pub fn decode_sorting(snapshot: &Snapshot, keys: &SortingKeys) -> Option<Sorting> {
    let column = present(snapshot, &keys.col).and_then(as_text)?;
    let descending = present(snapshot, &keys.dir)
        .and_then(as_text)
        .map(|d| d == "desc")
        .unwrap_or(false);
    Some(vec![SortRule { column, descending }])
}

pub fn encode_sorting(sorting: &Sorting, keys: &SortingKeys) -> Patch {
    match sorting.first() {
        Some(rule) => vec![
            (keys.col.clone(), Some(json!(rule.column))),
            (
                keys.dir.clone(),
                Some(json!(if rule.descending { "desc" } else { "asc" })),
            ),
        ],
        // No sort: absence is the canonical empty state.
        None => vec![(keys.col.clone(), None), (keys.dir.clone(), None)],
    }
}

// ---- column filters --------------------------------------------------------

fn number_bound(value: &Value) -> Option<Option<f64>> {
    match value {
        Value::Null => Some(None),
        other => as_number(other).map(Some),
    }
}

fn date_bound(value: &Value) -> Option<Option<NaiveDate>> {
    match value {
        Value::Null => Some(None),
        Value::String(s) if s.is_empty() => Some(None),
        Value::String(s) => NaiveDate::parse_from_str(s, DATE_FMT).ok().map(Some),
        _ => None,
    }
}

/// Decode one column's persisted filter value according to its declared
/// kind. Returns `None` for malformed values and for empty representations
/// (empty string, `[null, null]`, empty array).
pub fn decode_filter_value(kind: FilterKind, raw: &Value) -> Option<FilterValue> {
    match kind {
        FilterKind::Text => as_text(raw).filter(|s| !s.is_empty()).map(FilterValue::Text),
        FilterKind::Number => as_number(raw).map(FilterValue::Number),
        FilterKind::NumberRange => {
            let arr = raw.as_array().filter(|a| a.len() == 2)?;
            let min = number_bound(&arr[0])?;
            let max = number_bound(&arr[1])?;
            if min.is_none() && max.is_none() {
                return None;
            }
            Some(FilterValue::NumberRange { min, max })
        }
        FilterKind::DateRange => {
            let arr = raw.as_array().filter(|a| a.len() == 2)?;
            let from = date_bound(&arr[0])?;
            let to = date_bound(&arr[1])?;
            if from.is_none() && to.is_none() {
                return None;
            }
            Some(FilterValue::DateRange { from, to })
        }
        FilterKind::MultiSelect => {
            let arr = raw.as_array()?;
            let set = arr
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<BTreeSet<String>>>()?;
            if set.is_empty() {
                return None;
            }
            Some(FilterValue::MultiSelect(set))
        }
    }
}

/// Encode one filter value. `None` means "cleared" and removes the key.
pub fn encode_filter_value(value: &FilterValue) -> Option<Value> {
    match value {
        FilterValue::Text(s) if s.is_empty() => None,
        FilterValue::Text(s) => Some(json!(s)),
        FilterValue::Number(n) => Some(json!(n)),
        FilterValue::NumberRange {
            min: None,
            max: None,
        } => None,
        FilterValue::NumberRange { min, max } => Some(json!([min, max])),
        FilterValue::DateRange {
            from: None,
            to: None,
        } => None,
        FilterValue::DateRange { from, to } => Some(json!([
            from.map(|d| d.format(DATE_FMT).to_string()),
            to.map(|d| d.format(DATE_FMT).to_string()),
        ])),
        FilterValue::MultiSelect(set) if set.is_empty() => None,
        FilterValue::MultiSelect(set) => Some(json!(set)),
    }
}

pub fn decode_column_filters(snapshot: &Snapshot, columns: &[FilterColumn]) -> ColumnFilters {
    let mut out = ColumnFilters::new();
    for column in columns {
        let Some(raw) = present(snapshot, &column.id) else {
            continue;
        };
        match decode_filter_value(column.kind, raw) {
            Some(value) => {
                out.insert(column.id.clone(), value);
            }
            None => {
                log::warn!("discarding malformed filter value under '{}'", column.id);
            }
        }
    }
    out
}

/// Patch covering every declared column: set for columns with a value,
/// remove for columns cleared or absent in `next`.
pub fn encode_column_filters(next: &ColumnFilters, columns: &[FilterColumn]) -> Patch {
    columns
        .iter()
        .map(|column| {
            let value = next.get(&column.id).and_then(encode_filter_value);
            (column.id.clone(), value)
        })
        .collect()
}

// ---- global filter ---------------------------------------------------------

pub fn decode_global_filter(snapshot: &Snapshot, key: &str) -> Option<String> {
    present(snapshot, key).and_then(as_text)
}

pub fn encode_global_filter(value: &str, key: &str) -> Patch {
    if value.is_empty() {
        vec![(key.to_string(), None)]
    } else {
        vec![(key.to_string(), Some(json!(value)))]
    }
}

// ---- visibility / selection ------------------------------------------------

pub fn decode_bool_map(snapshot: &Snapshot, key: &str) -> Option<BTreeMap<String, bool>> {
    let raw = present(snapshot, key)?;
    let map = as_bool_map(raw);
    if map.is_none() {
        log::warn!("discarding malformed persisted value under '{key}'");
    }
    map
}

pub fn encode_bool_map(map: &BTreeMap<String, bool>, key: &str) -> Patch {
    // An empty map is a valid terminal state ("nothing selected"), so it is
    // written as `{}` rather than removed.
    vec![(key.to_string(), Some(json!(map)))]
}
