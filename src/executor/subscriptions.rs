//! Subscription ownership for one engine instance.
//!
//! Every execution runs under a generation number. Starting a new
//! execution tears down every subscription and task of the previous one
//! and bumps the generation; anything an older generation tries to
//! register afterwards is closed on arrival. At most one execution is
//! therefore ever live.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::AbortHandle;

use super::errors::{ExecutorError, ExecutorResult};
use crate::observability::{Event, EventLog};
use crate::store::{DataStore, SubscriptionHandle};

#[derive(Debug, Default)]
struct Registry {
    generation: u64,
    handles: Vec<SubscriptionHandle>,
    tasks: Vec<AbortHandle>,
}

/// Open subscriptions and running tasks of the current execution
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    registry: Mutex<Registry>,
    log: EventLog,
}

impl SubscriptionSet {
    pub fn new(log: EventLog) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            log,
        }
    }

    /// Tears down the current execution and starts a new generation.
    pub fn begin<S: DataStore + ?Sized>(&self, store: &S) -> u64 {
        let (generation, handles, tasks) = {
            let mut registry = self.registry();
            registry.generation += 1;
            (
                registry.generation,
                std::mem::take(&mut registry.handles),
                std::mem::take(&mut registry.tasks),
            )
        };
        self.teardown(store, handles, tasks);
        generation
    }

    /// Closes everything without starting a new execution.
    ///
    /// Returns the number of subscriptions closed.
    pub fn close_all<S: DataStore + ?Sized>(&self, store: &S) -> usize {
        let (handles, tasks) = {
            let mut registry = self.registry();
            registry.generation += 1;
            (
                std::mem::take(&mut registry.handles),
                std::mem::take(&mut registry.tasks),
            )
        };
        let closed = handles.len();
        self.teardown(store, handles, tasks);
        closed
    }

    /// Returns true if `generation` is the live execution
    pub fn is_current(&self, generation: u64) -> bool {
        self.registry().generation == generation
    }

    /// Registers a subscription opened by `generation`.
    ///
    /// A superseded generation gets its subscription closed immediately
    /// and `Cancelled` back.
    pub fn track<S: DataStore + ?Sized>(
        &self,
        generation: u64,
        handle: SubscriptionHandle,
        store: &S,
    ) -> ExecutorResult<()> {
        let accepted = {
            let mut registry = self.registry();
            if registry.generation == generation {
                registry.handles.push(handle);
            }
            registry.generation == generation
        };

        if accepted {
            return Ok(());
        }
        let _ = store.close_subscription(&handle);
        Err(ExecutorError::Cancelled)
    }

    /// Registers the task driving `generation`; a stale task is aborted.
    pub fn track_task(&self, generation: u64, task: AbortHandle) {
        let accepted = {
            let mut registry = self.registry();
            if registry.generation == generation {
                registry.tasks.retain(|t| !t.is_finished());
                registry.tasks.push(task.clone());
            }
            registry.generation == generation
        };
        if !accepted {
            task.abort();
        }
    }

    /// Closes one subscription before the rest of its execution ends
    pub fn release<S: DataStore + ?Sized>(&self, handle: &SubscriptionHandle, store: &S) {
        self.registry().handles.retain(|h| h != handle);
        if store.close_subscription(handle).is_ok() {
            let id = handle.to_string();
            self.log.emit(Event::SubscriptionClosed, &[("subscription", &id)]);
        }
    }

    /// Number of subscriptions held open
    pub fn len(&self) -> usize {
        self.registry().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the registry, ignoring poisoning
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn teardown<S: DataStore + ?Sized>(
        &self,
        store: &S,
        handles: Vec<SubscriptionHandle>,
        tasks: Vec<AbortHandle>,
    ) {
        for task in &tasks {
            task.abort();
        }
        // Already-closed handles are fine to skip
        let closed = handles
            .iter()
            .filter(|handle| store.close_subscription(handle).is_ok())
            .count();

        if closed > 0 || !tasks.is_empty() {
            let closed = closed.to_string();
            let aborted = tasks.len().to_string();
            self.log.emit(
                Event::SubscriptionsTornDown,
                &[("closed", &closed), ("tasks_aborted", &aborted)],
            );
        }
    }
}
