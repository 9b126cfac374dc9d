//! The composition hook a host table component consumes.
//!
//! `use_table_state` owns the two buckets for the mount, resolves every
//! slice's starting value, bootstraps missing defaults once, and exposes one
//! `RwSignal` plus an optional change callback per slice. A callback is
//! `None` exactly when that slice has no persistence configured — the host
//! then drives the signal itself.

use std::rc::Rc;

use leptos::prelude::*;

use table_state::{
    ColumnFilters, ColumnVisibility, Pagination, RowSelection, Sorting, TableSession,
    TableStateConfig, Updater,
};

use crate::buckets::{LocalStorageBucket, UrlBucket, WritePolicy, DEFAULT_LOCAL_STORAGE_KEY};

#[derive(Clone)]
pub struct TableStateHandle {
    pub pagination: RwSignal<Pagination>,
    pub sorting: RwSignal<Sorting>,
    pub column_filters: RwSignal<ColumnFilters>,
    pub global_filter: RwSignal<String>,
    pub column_visibility: RwSignal<ColumnVisibility>,
    pub row_selection: RwSignal<RowSelection>,

    pub on_pagination_change: Option<UnsyncCallback<Updater<Pagination>>>,
    pub on_sorting_change: Option<UnsyncCallback<Updater<Sorting>>>,
    pub on_column_filters_change: Option<UnsyncCallback<Updater<ColumnFilters>>>,
    pub on_global_filter_change: Option<UnsyncCallback<Updater<String>>>,
    pub on_column_visibility_change: Option<UnsyncCallback<Updater<ColumnVisibility>>>,
    pub on_row_selection_change: Option<UnsyncCallback<Updater<RowSelection>>>,
}

pub fn use_table_state(config: TableStateConfig) -> TableStateHandle {
    use_table_state_with_policy(config, WritePolicy::Immediate)
}

pub fn use_table_state_with_policy(
    config: TableStateConfig,
    policy: WritePolicy,
) -> TableStateHandle {
    let url = UrlBucket::shared(config.url_namespace.clone(), policy);
    let local = LocalStorageBucket::shared(
        config
            .local_storage_key
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_KEY.to_string()),
    );
    let session = Rc::new(TableSession::new(config, url, local));

    let resolved = session.resolve();

    let pagination = RwSignal::new(resolved.pagination.unwrap_or_default());
    let sorting = RwSignal::new(resolved.sorting.clone().unwrap_or_default());
    let column_filters = RwSignal::new(resolved.column_filters.clone().unwrap_or_default());
    let global_filter = RwSignal::new(resolved.global_filter.clone().unwrap_or_default());
    let column_visibility = RwSignal::new(resolved.column_visibility.clone().unwrap_or_default());
    let row_selection = RwSignal::new(resolved.row_selection.clone().unwrap_or_default());

    {
        // Mount-time effect; the session's phase guard makes re-runs no-ops.
        let session = session.clone();
        let resolved = resolved.clone();
        Effect::new(move |_| {
            if let Err(err) = session.bootstrap(&resolved) {
                log::warn!("table state bootstrap write failed: {err:#}");
            }
        });
    }

    let on_pagination_change = session.pagination_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<Pagination>| {
            match handler.apply(updater, pagination.get_untracked()) {
                Ok(next) => pagination.set(next),
                Err(err) => log::warn!("pagination write failed: {err:#}"),
            }
        })
    });

    let on_sorting_change = session.sorting_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<Sorting>| {
            match handler.apply(updater, sorting.get_untracked()) {
                Ok(next) => sorting.set(next),
                Err(err) => log::warn!("sorting write failed: {err:#}"),
            }
        })
    });

    let on_column_filters_change = session.column_filters_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<ColumnFilters>| {
            match handler.apply(
                updater,
                column_filters.get_untracked(),
                pagination.get_untracked(),
            ) {
                Ok(change) => {
                    column_filters.set(change.value);
                    match change.pagination {
                        Some(p) => pagination.set(p),
                        // Ephemeral pagination still snaps to the first page.
                        None => pagination.update(|p| p.page_index = 0),
                    }
                }
                Err(err) => log::warn!("column filter write failed: {err:#}"),
            }
        })
    });

    let on_global_filter_change = session.global_filter_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<String>| {
            match handler.apply(
                updater,
                global_filter.get_untracked(),
                pagination.get_untracked(),
            ) {
                Ok(change) => {
                    global_filter.set(change.value);
                    match change.pagination {
                        Some(p) => pagination.set(p),
                        None => pagination.update(|p| p.page_index = 0),
                    }
                }
                Err(err) => log::warn!("global filter write failed: {err:#}"),
            }
        })
    });

    let on_column_visibility_change = session.column_visibility_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<ColumnVisibility>| {
            match handler.apply(updater, column_visibility.get_untracked()) {
                Ok(next) => column_visibility.set(next),
                Err(err) => log::warn!("column visibility write failed: {err:#}"),
            }
        })
    });

    let on_row_selection_change = session.row_selection_handler().map(|handler| {
        UnsyncCallback::new(move |updater: Updater<RowSelection>| {
            match handler.apply(updater, row_selection.get_untracked()) {
                Ok(next) => row_selection.set(next),
                Err(err) => log::warn!("row selection write failed: {err:#}"),
            }
        })
    });

    TableStateHandle {
        pagination,
        sorting,
        column_filters,
        global_filter,
        column_visibility,
        row_selection,
        on_pagination_change,
        on_sorting_change,
        on_column_filters_change,
        on_global_filter_change,
        on_column_visibility_change,
        on_row_selection_change,
    }
}
