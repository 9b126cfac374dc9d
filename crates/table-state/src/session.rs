//! The orchestrating session: owns the two bucket handles for a mounted
//! table, resolves initial state, bootstraps missing defaults once and
//! hands out per-slice change handlers.

use std::cell::Cell;
use std::rc::Rc;

use anyhow::Result;

use crate::bucket::Bucket;
use crate::codec::{
    decode_bool_map, decode_column_filters, decode_global_filter, decode_page_index,
    decode_page_size, decode_sorting, PaginationKeys, SortingKeys, GLOBAL_FILTER_KEY,
    SELECTION_KEY, VISIBILITY_KEY,
};
use crate::config::TableStateConfig;
use crate::handler::{
    BoolMapHandler, ColumnFiltersHandler, GlobalFilterHandler, PaginationHandler, SortingHandler,
};
use crate::model::{StorageTarget, Updater};
use crate::resolve::{resolve_all, ResolvedTableState};

/// Two-phase lifecycle: the bootstrap write may happen only while
/// `Initializing`; every later call is a plain no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Initializing,
    Live,
}

pub struct TableSession {
    config: TableStateConfig,
    url: Rc<dyn Bucket>,
    local: Rc<dyn Bucket>,
    phase: Cell<Phase>,
}

impl TableSession {
    /// Buckets are injected, never looked up ambiently, so tests and
    /// non-browser hosts can supply their own.
    pub fn new(config: TableStateConfig, url: Rc<dyn Bucket>, local: Rc<dyn Bucket>) -> Self {
        Self {
            config,
            url,
            local,
            phase: Cell::new(Phase::Initializing),
        }
    }

    pub fn config(&self) -> &TableStateConfig {
        &self.config
    }

    pub fn url_bucket(&self) -> Rc<dyn Bucket> {
        self.url.clone()
    }

    pub fn local_bucket(&self) -> Rc<dyn Bucket> {
        self.local.clone()
    }

    fn bucket_for(&self, target: StorageTarget) -> Rc<dyn Bucket> {
        match target {
            StorageTarget::Url => self.url.clone(),
            StorageTarget::Local => self.local.clone(),
        }
    }

    /// Compute every slice's starting value from one snapshot per bucket.
    pub fn resolve(&self) -> ResolvedTableState {
        let url = self.url.get();
        let local = self.local.get();
        resolve_all(&self.config, &url, &local)
    }

    // ---- handlers ----------------------------------------------------------

    /// `None` exactly when pagination has no persistence configured; the
    /// host then manages pagination in plain memory.
    pub fn pagination_handler(&self) -> Option<PaginationHandler> {
        let target = self.config.pagination.storage?;
        let keys = PaginationKeys::from_config(self.config.pagination.key.as_deref());
        Some(PaginationHandler::new(self.bucket_for(target), keys))
    }

    pub fn sorting_handler(&self) -> Option<SortingHandler> {
        let target = self.config.sorting.storage?;
        let keys = SortingKeys::from_config(self.config.sorting.key.as_deref());
        Some(SortingHandler::new(self.bucket_for(target), keys))
    }

    /// Carries the pagination handler so every filter change routes the
    /// page reset through the ordinary pagination persistence path.
    pub fn column_filters_handler(&self) -> Option<ColumnFiltersHandler> {
        let target = self.config.column_filters.storage?;
        Some(ColumnFiltersHandler::new(
            self.bucket_for(target),
            Rc::new(self.config.column_filters.columns.clone()),
            self.pagination_handler(),
        ))
    }

    pub fn global_filter_handler(&self) -> Option<GlobalFilterHandler> {
        let target = self.config.global_filter.storage?;
        let key = self
            .config
            .global_filter
            .key
            .clone()
            .unwrap_or_else(|| GLOBAL_FILTER_KEY.to_string());
        Some(GlobalFilterHandler::new(
            self.bucket_for(target),
            key,
            self.pagination_handler(),
        ))
    }

    pub fn column_visibility_handler(&self) -> Option<BoolMapHandler> {
        let target = self.config.column_visibility.storage?;
        let key = self
            .config
            .column_visibility
            .key
            .clone()
            .unwrap_or_else(|| VISIBILITY_KEY.to_string());
        Some(BoolMapHandler::new(self.bucket_for(target), key))
    }

    pub fn row_selection_handler(&self) -> Option<BoolMapHandler> {
        let target = self.config.row_selection.storage?;
        let key = self
            .config
            .row_selection
            .key
            .clone()
            .unwrap_or_else(|| SELECTION_KEY.to_string());
        Some(BoolMapHandler::new(self.bucket_for(target), key))
    }

    // ---- bootstrap ---------------------------------------------------------

    /// Write each persisting slice's resolved initial value into its bucket
    /// if the bucket holds nothing valid for it yet, so a reload reproduces
    /// the first render exactly. Runs at most once per session; bucket
    /// updates after that never re-trigger it.
    pub fn bootstrap(&self, resolved: &ResolvedTableState) -> Result<()> {
        if self.phase.get() == Phase::Live {
            return Ok(());
        }
        // Flip before writing: even a failed write must not be retried by a
        // later effect firing, the caller decides what to do with the error.
        self.phase.set(Phase::Live);

        if let (Some(target), Some(value)) = (self.config.pagination.storage, resolved.pagination)
        {
            let snapshot = self.bucket_for(target).get();
            let keys = PaginationKeys::from_config(self.config.pagination.key.as_deref());
            let missing = decode_page_index(&snapshot, &keys).is_none()
                || decode_page_size(&snapshot, &keys).is_none();
            if missing {
                PaginationHandler::new(self.bucket_for(target), keys)
                    .apply(Updater::Set(value), value)?;
            }
        }

        if let (Some(target), Some(value)) = (self.config.sorting.storage, &resolved.sorting) {
            let snapshot = self.bucket_for(target).get();
            let keys = SortingKeys::from_config(self.config.sorting.key.as_deref());
            if decode_sorting(&snapshot, &keys).is_none() && !value.is_empty() {
                SortingHandler::new(self.bucket_for(target), keys)
                    .apply(Updater::Set(value.clone()), value.clone())?;
            }
        }

        if let (Some(target), Some(value)) = (
            self.config.column_filters.storage,
            &resolved.column_filters,
        ) {
            let bucket = self.bucket_for(target);
            let snapshot = bucket.get();
            let columns = &self.config.column_filters.columns;
            if decode_column_filters(&snapshot, columns).is_empty() && !value.is_empty() {
                // Plain handler without the pagination side effect: the
                // bootstrap is not a user-initiated filter change.
                let handler =
                    ColumnFiltersHandler::new(bucket, Rc::new(columns.clone()), None);
                handler.apply(
                    Updater::Set(value.clone()),
                    value.clone(),
                    resolved.pagination.unwrap_or_default(),
                )?;
            }
        }

        if let (Some(target), Some(value)) =
            (self.config.global_filter.storage, &resolved.global_filter)
        {
            let bucket = self.bucket_for(target);
            let key = self
                .config
                .global_filter
                .key
                .clone()
                .unwrap_or_else(|| GLOBAL_FILTER_KEY.to_string());
            if decode_global_filter(&bucket.get(), &key).is_none() && !value.is_empty() {
                let handler = GlobalFilterHandler::new(bucket, key, None);
                handler.apply(
                    Updater::Set(value.clone()),
                    value.clone(),
                    resolved.pagination.unwrap_or_default(),
                )?;
            }
        }

        if let (Some(target), Some(value)) = (
            self.config.column_visibility.storage,
            &resolved.column_visibility,
        ) {
            let key = self
                .config
                .column_visibility
                .key
                .clone()
                .unwrap_or_else(|| VISIBILITY_KEY.to_string());
            if decode_bool_map(&self.bucket_for(target).get(), &key).is_none() {
                BoolMapHandler::new(self.bucket_for(target), key)
                    .apply(Updater::Set(value.clone()), value.clone())?;
            }
        }

        if let (Some(target), Some(value)) =
            (self.config.row_selection.storage, &resolved.row_selection)
        {
            let key = self
                .config
                .row_selection
                .key
                .clone()
                .unwrap_or_else(|| SELECTION_KEY.to_string());
            if decode_bool_map(&self.bucket_for(target).get(), &key).is_none() {
                BoolMapHandler::new(self.bucket_for(target), key)
                    .apply(Updater::Set(value.clone()), value.clone())?;
            }
        }

        Ok(())
    }
}
