//! Caller-facing configuration: which slices persist, where, and under
//! which keys, plus the caller-supplied defaults.

use crate::model::{
    ColumnFilters, ColumnVisibility, FilterKind, Pagination, RowSelection, Sorting, StorageTarget,
};

/// Persistence settings for one slice. `storage: None` means the slice is
/// ephemeral and the host manages it in plain memory.
#[derive(Debug, Clone, Default)]
pub struct SliceConfig {
    pub storage: Option<StorageTarget>,
    /// Base bucket key; falls back to the slice's canonical name.
    pub key: Option<String>,
}

impl SliceConfig {
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn url() -> Self {
        Self {
            storage: Some(StorageTarget::Url),
            key: None,
        }
    }

    pub fn local() -> Self {
        Self {
            storage: Some(StorageTarget::Local),
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// A filterable column: its bucket key is the column id itself.
#[derive(Debug, Clone)]
pub struct FilterColumn {
    pub id: String,
    pub kind: FilterKind,
}

impl FilterColumn {
    pub fn new(id: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Column filters persist one key per declared column, so their config
/// carries the column list instead of a single key.
#[derive(Debug, Clone, Default)]
pub struct FiltersConfig {
    pub storage: Option<StorageTarget>,
    pub columns: Vec<FilterColumn>,
}

impl FiltersConfig {
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn url(columns: Vec<FilterColumn>) -> Self {
        Self {
            storage: Some(StorageTarget::Url),
            columns,
        }
    }

    pub fn local(columns: Vec<FilterColumn>) -> Self {
        Self {
            storage: Some(StorageTarget::Local),
            columns,
        }
    }
}

/// Caller defaults, used whenever a slice has nothing valid persisted.
#[derive(Debug, Clone, Default)]
pub struct TableDefaults {
    pub pagination: Option<Pagination>,
    pub sorting: Option<Sorting>,
    pub column_filters: Option<ColumnFilters>,
    pub global_filter: Option<String>,
    pub column_visibility: Option<ColumnVisibility>,
    pub row_selection: Option<RowSelection>,
}

/// Whole-table configuration.
#[derive(Debug, Clone, Default)]
pub struct TableStateConfig {
    /// Key prefix inside the URL bucket, isolating this table from others
    /// sharing one page. E.g. namespace `test-table` stores `?test-table.page=0`.
    pub url_namespace: Option<String>,
    /// localStorage key the local bucket persists its JSON document under.
    pub local_storage_key: Option<String>,

    pub pagination: SliceConfig,
    pub sorting: SliceConfig,
    pub column_filters: FiltersConfig,
    pub global_filter: SliceConfig,
    pub column_visibility: SliceConfig,
    pub row_selection: SliceConfig,

    pub defaults: TableDefaults,
}
