//! Browser bindings for `table-state`: URL and localStorage buckets plus
//! the Leptos composition hook.

pub mod buckets;
pub mod hook;
pub mod query;

pub use buckets::{LocalStorageBucket, UrlBucket, WritePolicy, DEFAULT_LOCAL_STORAGE_KEY};
pub use hook::{use_table_state, use_table_state_with_policy, TableStateHandle};
