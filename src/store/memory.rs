//! # In-Memory Store
//!
//! JSON tree with a listener registry. Every write fans a fresh snapshot out
//! to each listener whose path overlaps the written path. Listeners whose
//! receiver is gone are pruned on the next fan-out.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::errors::{StoreError, StoreResult};
use super::{
    DataStore, Snapshot, SnapshotSender, StoreFuture, StoreQuery, Subscription, SubscriptionHandle,
};
use crate::value::{child_path, loosely_equal, normalize_path, path_segments, FieldPath};

/// A registered subscription
#[derive(Debug)]
struct Listener {
    query: StoreQuery,
    sender: SnapshotSender,
}

/// In-memory `DataStore`
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Whole tree
    root: RwLock<Value>,

    /// Open subscriptions by handle
    listeners: RwLock<HashMap<SubscriptionHandle, Listener>>,

    /// Paths whose subscriptions are refused
    denied_reads: RwLock<HashSet<String>>,

    /// Reject every write
    read_only: bool,

    /// Push key sequence
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `data`
    pub fn with_data(data: Value) -> Self {
        Self {
            root: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Create a store holding `data` that rejects every write
    pub fn read_only(data: Value) -> Self {
        Self {
            root: RwLock::new(data),
            read_only: true,
            ..Self::default()
        }
    }

    /// Refuse subscriptions to `path`
    pub fn deny_reads(&self, path: &str) {
        if let Ok(mut denied) = self.denied_reads.write() {
            denied.insert(normalize_path(path));
        }
    }

    /// Current value at `path`; `Null` when absent
    pub fn value_at(&self, path: &str) -> Value {
        self.root
            .read()
            .ok()
            .and_then(|root| FieldPath::parse(path).resolve(&root).cloned())
            .unwrap_or(Value::Null)
    }

    /// Number of open subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }

    /// Evaluates a query against the current tree
    fn snapshot(&self, query: &StoreQuery) -> Value {
        let value = self.value_at(&query.path);
        let Some((field, expected)) = &query.equal_to else {
            return value;
        };

        let matched: Map<String, Value> = match value {
            Value::Object(children) => children
                .into_iter()
                .filter(|(_, child)| {
                    field
                        .resolve(child)
                        .is_some_and(|actual| loosely_equal(actual, expected))
                })
                .collect(),
            _ => Map::new(),
        };

        if matched.is_empty() {
            Value::Null
        } else {
            Value::Object(matched)
        }
    }

    /// Sends a fresh snapshot to every listener overlapping `written`
    fn notify(&self, written: &str) {
        let mut dead = Vec::new();

        if let Ok(listeners) = self.listeners.read() {
            for (handle, listener) in listeners.iter() {
                if !overlaps(&listener.query.path, written) {
                    continue;
                }
                let snapshot = Snapshot {
                    path: listener.query.path.clone(),
                    value: self.snapshot(&listener.query),
                };
                if listener.sender.send(snapshot).is_err() {
                    dead.push(*handle);
                }
            }
        }

        if !dead.is_empty() {
            if let Ok(mut listeners) = self.listeners.write() {
                for handle in dead {
                    listeners.remove(&handle);
                }
            }
        }
    }

    /// Applies a write to the tree, then notifies
    fn write(&self, path: &str, apply: impl FnOnce(&mut Value)) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::rejected(path, "store is read-only"));
        }
        {
            let mut root = self
                .root
                .write()
                .map_err(|_| StoreError::rejected(path, "store lock poisoned"))?;
            apply(&mut root);
        }
        self.notify(path);
        Ok(())
    }

    fn next_push_key(&self) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        format!("{:012x}{:06x}", Utc::now().timestamp_millis(), sequence)
    }
}

/// Writes or removes the value at `path`
fn put(root: &mut Value, path: &str, value: Value) {
    let field = FieldPath::parse(path);
    if field.is_empty() {
        *root = value;
    } else if value.is_null() {
        remove(root, field.segments());
    } else {
        field.assign(root, value);
    }
}

/// Removes a child, pruning parents left empty
fn remove(node: &mut Value, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.remove(first);
        return;
    }
    if let Some(child) = map.get_mut(first) {
        remove(child, rest);
        if child.as_object().is_some_and(Map::is_empty) {
            map.remove(first);
        }
    }
}

/// True if `path` equals `ancestor` or lies under it
fn is_within(path: &str, ancestor: &str) -> bool {
    let mut segments = path_segments(path);
    path_segments(ancestor).all(|segment| segments.next() == Some(segment))
}

/// True if one path is an ancestor of, or equal to, the other
fn overlaps(a: &str, b: &str) -> bool {
    path_segments(a)
        .zip(path_segments(b))
        .all(|(x, y)| x == y)
}

impl DataStore for MemoryStore {
    fn open_subscription(&self, query: StoreQuery) -> StoreFuture<'_, Subscription> {
        Box::pin(async move {
            let denied = self
                .denied_reads
                .read()
                .map(|denied| denied.iter().any(|path| is_within(&query.path, path)))
                .unwrap_or(false);
            if denied {
                return Err(StoreError::SubscriptionFailed {
                    path: query.path.clone(),
                    reason: "permission denied".to_string(),
                });
            }

            // Registry lock spans the initial read so a concurrent write's
            // notify runs after this listener is registered
            let mut listeners = self.listeners.write().map_err(|_| StoreError::SubscriptionFailed {
                path: query.path.clone(),
                reason: "listener registry poisoned".to_string(),
            })?;

            let (sender, receiver) = mpsc::unbounded_channel();
            let handle = SubscriptionHandle::new();
            let initial = Snapshot {
                path: query.path.clone(),
                value: self.snapshot(&query),
            };
            // Receiver is held below; the send cannot fail
            let _ = sender.send(initial);
            listeners.insert(handle, Listener { query, sender });

            Ok(Subscription { handle, receiver })
        })
    }

    fn close_subscription(&self, handle: &SubscriptionHandle) -> StoreResult<()> {
        let removed = self
            .listeners
            .write()
            .ok()
            .and_then(|mut listeners| listeners.remove(handle));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::SubscriptionNotFound(handle.to_string())),
        }
    }

    fn set_value<'a>(&'a self, path: &'a str, value: Value) -> StoreFuture<'a, ()> {
        Box::pin(async move { self.write(path, |root| put(root, path, value)) })
    }

    fn update_fields<'a>(
        &'a self,
        path: &'a str,
        fields: Map<String, Value>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.write(path, |root| {
                for (key, value) in fields {
                    put(root, &child_path(path, &key), value);
                }
            })
        })
    }

    fn push_new_record<'a>(&'a self, path: &'a str, record: Value) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let key = self.next_push_key();
            let target = child_path(path, &key);
            self.write(&target, |root| put(root, &target, record))
                .map(|_| key)
        })
    }

    fn delete_value<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if normalize_path(path).is_empty() {
                return Err(StoreError::InvalidPath(path.to_string()));
            }
            self.write(path, |root| put(root, path, Value::Null))
        })
    }
}
