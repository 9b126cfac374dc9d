//! Browser-backed buckets: URL query string and localStorage.
//!
//! Both keep an in-memory mirror that is the read path. A patch updates the
//! mirror and notifies subscribers synchronously; persisting to the browser
//! happens right after (or, for the URL, after an optional debounce that
//! coalesces `replace_state` calls without ever delaying reads).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use gloo_timers::future::TimeoutFuture;
use leptos::task::spawn_local;
use wasm_bindgen::JsValue;
use web_sys::window;

use table_state::{apply_patch, Bucket, Listener, Patch, Snapshot};

use crate::query::{build_query, parse_query};

/// How URL writes are flushed. Debouncing is a responsiveness concern for
/// fast typing; the snapshot itself always updates immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    Immediate,
    /// Coalesce `replace_state` calls within the given window (ms).
    Debounced(u32),
}

fn current_search() -> String {
    window()
        .and_then(|w| w.location().search().ok())
        .unwrap_or_default()
}

fn write_search(namespace: Option<&str>, snapshot: &Snapshot) {
    let Some(w) = window() else {
        return;
    };
    let query = build_query(&current_search(), namespace, snapshot);
    let new_search = if query.is_empty() {
        String::new()
    } else {
        format!("?{query}")
    };
    if current_search() == new_search {
        return;
    }
    let url = if new_search.is_empty() {
        w.location().pathname().unwrap_or_else(|_| "/".to_string())
    } else {
        new_search
    };
    if let Ok(history) = w.history() {
        // replace, not push: no history entry per keystroke
        if let Err(err) = history.replace_state_with_url(&JsValue::NULL, "", Some(&url)) {
            log::warn!("url state write failed: {err:?}");
        }
    }
}

/// Bucket persisted in the URL query string under an optional namespace.
pub struct UrlBucket {
    namespace: Option<String>,
    policy: WritePolicy,
    state: Rc<RefCell<Snapshot>>,
    listeners: RefCell<Vec<Listener>>,
    generation: Rc<Cell<u64>>,
}

impl UrlBucket {
    /// Seeds the mirror from the current location; outside a browser the
    /// bucket starts empty and writes are skipped.
    pub fn new(namespace: Option<String>, policy: WritePolicy) -> Self {
        let state = parse_query(&current_search(), namespace.as_deref());
        Self {
            namespace,
            policy,
            state: Rc::new(RefCell::new(state)),
            listeners: RefCell::new(Vec::new()),
            generation: Rc::new(Cell::new(0)),
        }
    }

    pub fn shared(namespace: Option<String>, policy: WritePolicy) -> Rc<Self> {
        Rc::new(Self::new(namespace, policy))
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        let snapshot = self.state.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    fn flush(&self) {
        match self.policy {
            WritePolicy::Immediate => {
                write_search(self.namespace.as_deref(), &self.state.borrow());
            }
            WritePolicy::Debounced(ms) => {
                let generation = self.generation.get() + 1;
                self.generation.set(generation);
                let namespace = self.namespace.clone();
                let state = self.state.clone();
                let latest = self.generation.clone();
                spawn_local(async move {
                    TimeoutFuture::new(ms).await;
                    // Only the newest pending write goes through.
                    if latest.get() == generation {
                        write_search(namespace.as_deref(), &state.borrow());
                    }
                });
            }
        }
    }
}

impl Bucket for UrlBucket {
    fn get(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    fn patch(&self, patch: Patch) -> Result<()> {
        apply_patch(&mut self.state.borrow_mut(), patch);
        self.notify();
        self.flush();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.state.borrow_mut().clear();
        self.notify();
        self.flush();
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }
}

pub const DEFAULT_LOCAL_STORAGE_KEY: &str = "table-state";

fn local_storage() -> Option<web_sys::Storage> {
    window()?.local_storage().ok()?
}

/// Bucket persisted as one JSON document under one localStorage key.
pub struct LocalStorageBucket {
    storage_key: String,
    state: RefCell<Snapshot>,
    listeners: RefCell<Vec<Listener>>,
}

impl LocalStorageBucket {
    /// Corrupt stored JSON degrades to an empty snapshot, it never errors.
    pub fn new(storage_key: impl Into<String>) -> Self {
        let storage_key = storage_key.into();
        let state = local_storage()
            .and_then(|s| s.get_item(&storage_key).ok().flatten())
            .and_then(|raw| match serde_json::from_str::<Snapshot>(&raw) {
                Ok(snapshot) => Some(snapshot),
                Err(_) => {
                    log::warn!("corrupt localStorage document under '{storage_key}', starting empty");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            storage_key,
            state: RefCell::new(state),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn shared(storage_key: impl Into<String>) -> Rc<Self> {
        Rc::new(Self::new(storage_key))
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        let snapshot = self.state.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Write failures (quota, private browsing) propagate to the caller;
    /// the mirror stays updated either way so reads remain consistent.
    fn persist(&self) -> Result<()> {
        let Some(storage) = local_storage() else {
            return Ok(());
        };
        let raw = serde_json::to_string(&*self.state.borrow())?;
        storage
            .set_item(&self.storage_key, &raw)
            .map_err(|err| anyhow!("localStorage write failed: {err:?}"))
    }
}

impl Bucket for LocalStorageBucket {
    fn get(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    fn patch(&self, patch: Patch) -> Result<()> {
        apply_patch(&mut self.state.borrow_mut(), patch);
        self.notify();
        self.persist()
    }

    fn clear(&self) -> Result<()> {
        self.state.borrow_mut().clear();
        self.notify();
        if let Some(storage) = local_storage() {
            storage
                .remove_item(&self.storage_key)
                .map_err(|err| anyhow!("localStorage remove failed: {err:?}"))?;
        }
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }
}
