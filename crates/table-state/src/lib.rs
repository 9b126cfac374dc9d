//! Persistence reconciliation for interactive table state.
//!
//! A table's interactive state (pagination, sorting, column filters, global
//! filter, column visibility, row selection) is split into slices. Each
//! slice can be bound to one of two buckets — the URL query string or
//! localStorage — or left ephemeral. This crate decides where each slice's
//! source of truth lives, merges persisted values with caller defaults on
//! mount, writes updates back to the right bucket, and keeps the one
//! cross-slice rule (filter changes reset the page) on the ordinary
//! persistence path.
//!
//! The crate is framework free; browser buckets and the Leptos hook live in
//! `table-state-web`.

pub mod bucket;
pub mod codec;
pub mod config;
pub mod handler;
pub mod model;
pub mod resolve;
pub mod session;
pub mod validate;

pub use bucket::{apply_patch, Bucket, Listener, MemoryBucket, Patch, Snapshot};
pub use config::{FilterColumn, FiltersConfig, SliceConfig, TableDefaults, TableStateConfig};
pub use handler::{
    BoolMapHandler, ColumnFiltersHandler, FilterChange, GlobalFilterHandler, PaginationHandler,
    SortingHandler,
};
pub use model::{
    ColumnFilters, ColumnVisibility, FilterKind, FilterValue, Pagination, RowSelection, SortRule,
    Sorting, StorageTarget, Updater,
};
pub use resolve::{resolve_all, ResolvedTableState};
pub use session::TableSession;
