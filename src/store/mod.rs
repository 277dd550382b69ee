//! # Data Store
//!
//! Contract with the hierarchical key-value backend.
//!
//! The backend holds a JSON tree addressed by `/`-separated paths. Reads
//! are push subscriptions: the current snapshot is delivered immediately,
//! then a fresh snapshot after every write under the subscribed path, until
//! the subscription is closed. One equality filter may be executed
//! natively per subscription.

mod errors;
mod memory;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::value::{normalize_path, FieldPath};

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Snapshot channel for one subscription
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// Sender half held by the store
pub type SnapshotSender = mpsc::UnboundedSender<Snapshot>;

/// A subscribable location, optionally filtered natively
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub path: String,
    /// Child field and the value it must equal
    pub equal_to: Option<(FieldPath, Value)>,
}

impl StoreQuery {
    /// Unfiltered subscription to `path`
    pub fn at(path: &str) -> Self {
        Self {
            path: normalize_path(path),
            equal_to: None,
        }
    }

    /// Keep only children whose `field` equals `value`
    pub fn equal_to(mut self, field: FieldPath, value: Value) -> Self {
        self.equal_to = Some((field, value));
        self
    }
}

/// Identifies an open subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One delivery: the whole value at the subscribed path. `Null` when the
/// path is empty or nothing matches the native filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub value: Value,
}

/// An open subscription
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub receiver: SnapshotReceiver,
}

/// Hierarchical key-value backend
pub trait DataStore: Send + Sync {
    /// Opens a push subscription
    fn open_subscription(&self, query: StoreQuery) -> StoreFuture<'_, Subscription>;

    /// Stops deliveries for `handle`
    fn close_subscription(&self, handle: &SubscriptionHandle) -> StoreResult<()>;

    /// Replaces the value at `path`; `Null` removes it
    fn set_value<'a>(&'a self, path: &'a str, value: Value) -> StoreFuture<'a, ()>;

    /// Writes several children of `path`. A `/` in a key addresses a
    /// nested child.
    fn update_fields<'a>(&'a self, path: &'a str, fields: Map<String, Value>)
        -> StoreFuture<'a, ()>;

    /// Adds a child under a generated key and returns the key
    fn push_new_record<'a>(&'a self, path: &'a str, record: Value) -> StoreFuture<'a, String>;

    /// Removes the value at `path`
    fn delete_value<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()>;
}
