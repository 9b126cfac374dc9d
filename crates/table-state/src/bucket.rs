//! The bucket abstraction: a flat key/value container bound to one
//! persistence target, plus an in-memory implementation used by tests and
//! non-browser hosts.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::Result;
use serde_json::Value;

/// A full snapshot of a bucket's contents.
pub type Snapshot = BTreeMap<String, Value>;

/// A shallow-merge update. `None` removes the key, keys not listed are
/// left untouched.
pub type Patch = Vec<(String, Option<Value>)>;

pub type Listener = Rc<dyn Fn(&Snapshot)>;

/// One of the two physical stores shared by all slices of a table.
///
/// Subscribers are notified synchronously after every patch, with the
/// post-patch snapshot, before any later patch can be observed.
pub trait Bucket {
    fn get(&self) -> Snapshot;
    fn patch(&self, patch: Patch) -> Result<()>;
    fn clear(&self) -> Result<()>;
    fn subscribe(&self, listener: Listener);
}

/// Shallow-merge `patch` into `snapshot`.
pub fn apply_patch(snapshot: &mut Snapshot, patch: Patch) {
    for (key, value) in patch {
        match value {
            Some(value) => {
                snapshot.insert(key, value);
            }
            None => {
                snapshot.remove(&key);
            }
        }
    }
}

/// In-memory bucket. Backs unit tests and any host without a browser.
#[derive(Default)]
pub struct MemoryBucket {
    state: RefCell<Snapshot>,
    listeners: RefCell<Vec<Listener>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RefCell::new(snapshot),
            listeners: RefCell::new(Vec::new()),
        }
    }

    fn notify(&self) {
        // Clone the listener list so a listener may patch or subscribe
        // without hitting a reborrow.
        let listeners: Vec<Listener> = self.listeners.borrow().clone();
        let snapshot = self.state.borrow().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

impl Bucket for MemoryBucket {
    fn get(&self) -> Snapshot {
        self.state.borrow().clone()
    }

    fn patch(&self, patch: Patch) -> Result<()> {
        apply_patch(&mut self.state.borrow_mut(), patch);
        self.notify();
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.state.borrow_mut().clear();
        self.notify();
        Ok(())
    }

    fn subscribe(&self, listener: Listener) {
        self.listeners.borrow_mut().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_merges_and_removes() {
        let bucket = MemoryBucket::new();
        bucket
            .patch(vec![
                ("a".into(), Some(json!(1))),
                ("b".into(), Some(json!("x"))),
            ])
            .unwrap();
        bucket
            .patch(vec![("a".into(), Some(json!(2))), ("b".into(), None)])
            .unwrap();

        let snap = bucket.get();
        assert_eq!(snap.get("a"), Some(&json!(2)));
        assert!(!snap.contains_key("b"));
    }

    #[test]
    fn untouched_keys_survive_patch() {
        let bucket = MemoryBucket::new();
        bucket.patch(vec![("a".into(), Some(json!(1)))]).unwrap();
        bucket.patch(vec![("b".into(), Some(json!(2)))]).unwrap();
        assert_eq!(bucket.get().len(), 2);
    }

    #[test]
    fn subscribers_see_post_patch_snapshot_synchronously() {
        let bucket = Rc::new(MemoryBucket::new());
        let seen: Rc<RefCell<Vec<Snapshot>>> = Rc::new(RefCell::new(Vec::new()));

        let seen_cb = seen.clone();
        bucket.subscribe(Rc::new(move |snap: &Snapshot| {
            seen_cb.borrow_mut().push(snap.clone());
        }));

        bucket.patch(vec![("k".into(), Some(json!("v")))]).unwrap();
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].get("k"), Some(&json!("v")));

        bucket.patch(vec![("k".into(), None)]).unwrap();
        assert_eq!(seen.borrow().len(), 2);
        assert!(!seen.borrow()[1].contains_key("k"));
    }

    #[test]
    fn clear_empties_and_notifies() {
        let bucket = MemoryBucket::with_snapshot(Snapshot::from([("a".to_string(), json!(1))]));
        let hits = Rc::new(RefCell::new(0));
        let hits_cb = hits.clone();
        bucket.subscribe(Rc::new(move |_| *hits_cb.borrow_mut() += 1));

        bucket.clear().unwrap();
        assert!(bucket.get().is_empty());
        assert_eq!(*hits.borrow(), 1);
    }
}
