//! Preview and commit execution.
//!
//! Preview never writes. Selects, updates and deletes stream one result per
//! store delivery for as long as the subscription lives; an insert preview
//! is a single result.
//!
//! Commit uses only the first delivery: the subscription is closed, the
//! planned writes are issued together and a single `committed` result is
//! emitted. Later deliveries are never turned into further writes.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::{ExecutorError, ExecutorResult};
use super::executor::{PrimaryFetch, QueryExecutor};
use super::result::ResultEmitter;
use crate::observability::Event;
use crate::parser::{DeleteStatement, InsertStatement, SelectStatement, Statement, UpdateStatement};
use crate::planner::{plan_delete, plan_insert, plan_update};
use crate::store::{DataStore, StoreResult};
use crate::value::child_path;

/// How a statement is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Compute the outcome without writing
    #[default]
    Preview,
    /// Write the outcome
    Commit,
}

/// Runs one parsed statement for one execution generation
pub struct CommitExecutor<'a, S: DataStore + ?Sized> {
    executor: &'a QueryExecutor<S>,
    generation: u64,
    mode: ExecutionMode,
    placeholder_prefix: &'a str,
}

impl<'a, S: DataStore + ?Sized> CommitExecutor<'a, S> {
    pub fn new(
        executor: &'a QueryExecutor<S>,
        generation: u64,
        mode: ExecutionMode,
        placeholder_prefix: &'a str,
    ) -> Self {
        Self {
            executor,
            generation,
            mode,
            placeholder_prefix,
        }
    }

    /// Executes `statement`, emitting its results.
    ///
    /// Returns when the execution is finished. A superseded execution
    /// returns `Cancelled`.
    pub async fn run(&self, statement: &Statement, emitter: &mut ResultEmitter) -> ExecutorResult<()> {
        match statement {
            Statement::Select(select) => self.run_select(select, emitter).await,
            Statement::Update(update) => self.run_update(update, emitter).await,
            Statement::Insert(insert) => self.run_insert(insert, emitter).await,
            Statement::Delete(delete) => self.run_delete(delete, emitter).await,
        }
    }

    /// Selects have nothing to commit and are always live
    async fn run_select(&self, select: &SelectStatement, emitter: &mut ResultEmitter) -> ExecutorResult<()> {
        let mut fetch = self
            .executor
            .open_primary(self.generation, &select.collection, &select.predicates)
            .await?;
        let projection = select.projection.as_ref();

        self.stream_previews(&mut fetch, emitter, |fetch, snapshot| {
            Ok(fetch.select_payload(snapshot, projection))
        })
        .await
    }

    async fn run_update(&self, update: &UpdateStatement, emitter: &mut ResultEmitter) -> ExecutorResult<()> {
        let mut fetch = self
            .executor
            .open_primary(self.generation, &update.collection, &update.predicates)
            .await?;
        let assignments = update.assignments.as_slice();

        if self.mode == ExecutionMode::Preview {
            return self
                .stream_previews(&mut fetch, emitter, |fetch, snapshot| {
                    Ok(plan_update(&fetch.matched(snapshot), assignments)?.payload())
                })
                .await;
        }

        let snapshot = self.executor.first_snapshot(self.generation, &mut fetch).await?;
        let plan = plan_update(&fetch.matched(snapshot.value), assignments)?;
        self.executor.ensure_current(self.generation)?;

        let store = self.executor.store();
        let writes = plan.records.keys().filter_map(|key| {
            plan.field_updates(key)
                .map(|fields| (child_path(&fetch.path, key), fields))
        });
        Self::settle(join_all(writes.map(|(path, fields)| async move {
            store.update_fields(&path, fields).await
        }))
        .await)?;

        self.log_commit(&fetch.path, plan.records.len());
        emitter.payload(plan.payload(), None, true, None);
        Ok(())
    }

    async fn run_delete(&self, delete: &DeleteStatement, emitter: &mut ResultEmitter) -> ExecutorResult<()> {
        let mut fetch = self
            .executor
            .open_primary(self.generation, &delete.collection, &delete.predicates)
            .await?;

        if self.mode == ExecutionMode::Preview {
            return self
                .stream_previews(&mut fetch, emitter, |fetch, snapshot| {
                    Ok(plan_delete(&fetch.matched(snapshot)).payload())
                })
                .await;
        }

        let snapshot = self.executor.first_snapshot(self.generation, &mut fetch).await?;
        let plan = plan_delete(&fetch.matched(snapshot.value));
        self.executor.ensure_current(self.generation)?;

        let store = self.executor.store();
        let paths: Vec<String> = plan.keys().map(|key| child_path(&fetch.path, key)).collect();
        Self::settle(join_all(paths.iter().map(|path| store.delete_value(path))).await)?;

        self.log_commit(&fetch.path, paths.len());
        emitter.payload(plan.payload(), None, true, None);
        Ok(())
    }

    async fn run_insert(&self, insert: &InsertStatement, emitter: &mut ResultEmitter) -> ExecutorResult<()> {
        let plan = plan_insert(&insert.tuple, self.placeholder_prefix);
        let path = insert.collection.as_str();
        self.executor.ensure_current(self.generation)?;

        if self.mode == ExecutionMode::Preview {
            emitter.payload(plan.payload(), None, false, Some(plan.len()));
            self.log_preview(path, emitter.version());
            return Ok(());
        }

        let count = plan.len();
        let store = self.executor.store();
        let pushes = plan
            .records
            .iter()
            .map(|(_, record)| store.push_new_record(path, record.clone()));
        let keys = Self::settle(join_all(pushes).await)?;

        let committed: Map<String, Value> = keys
            .into_iter()
            .zip(plan.records.into_iter().map(|(_, record)| record))
            .collect();
        self.log_commit(path, committed.len());
        emitter.payload(Value::Object(committed), None, true, Some(count));
        Ok(())
    }

    /// Emits one result per delivery until the subscription closes
    async fn stream_previews<F>(
        &self,
        fetch: &mut PrimaryFetch,
        emitter: &mut ResultEmitter,
        mut render: F,
    ) -> ExecutorResult<()>
    where
        F: FnMut(&PrimaryFetch, Value) -> ExecutorResult<Value> + Send,
    {
        while let Some(snapshot) = fetch.next_snapshot().await {
            self.executor.log_delivery(fetch);

            let payload = match render(&*fetch, snapshot.value) {
                Ok(payload) => payload,
                Err(err) => {
                    self.executor.release(fetch);
                    return Err(err);
                }
            };
            if !emitter.payload(payload, Some(fetch.handle()), false, None) {
                // Consumer is gone
                self.executor.release(fetch);
                return Ok(());
            }
            self.log_preview(&fetch.path, emitter.version());
        }
        Err(self.executor.ended(self.generation, &fetch.path))
    }

    /// First write failure wins
    fn settle<T>(outcomes: Vec<StoreResult<T>>) -> ExecutorResult<Vec<T>> {
        outcomes
            .into_iter()
            .collect::<StoreResult<Vec<T>>>()
            .map_err(ExecutorError::from)
    }

    fn log_preview(&self, path: &str, version: u64) {
        let version = version.to_string();
        self.executor
            .log()
            .emit(Event::PreviewReady, &[("path", path), ("version", &version)]);
    }

    fn log_commit(&self, path: &str, writes: usize) {
        let writes = writes.to_string();
        self.executor
            .log()
            .emit(Event::CommitIssued, &[("path", path), ("writes", &writes)]);
    }
}
