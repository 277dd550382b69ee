//! Query engine
//!
//! The function-call boundary of the crate. One engine owns one store
//! handle and at most one live execution: every `execute` first tears
//! down whatever the previous execution left open.
//!
//! No error crosses this boundary. Parse, evaluation and backend failures
//! arrive as results with `error` set; a superseded execution simply ends
//! its stream.

pub mod config;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub use config::{ConfigError, EngineConfig};
pub use crate::executor::ExecutionMode;

use crate::executor::{
    CommitExecutor, ExecutionResult, ExecutorError, QueryExecutor, ResultEmitter, ResultHeader,
    ResultStream, SubscriptionSet,
};
use crate::observability::{Event, EventLog};
use crate::parser::{classify, clean_query, parse_statement, Statement};
use crate::store::DataStore;

/// Executes query text against one store
pub struct QueryEngine<S: DataStore + ?Sized + 'static> {
    executor: Arc<QueryExecutor<S>>,
    subscriptions: Arc<SubscriptionSet>,
    config: Arc<EngineConfig>,
    log: EventLog,
}

impl<S: DataStore + ?Sized + 'static> QueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: EngineConfig) -> Self {
        let log = EventLog::new(config.log_events);
        let subscriptions = Arc::new(SubscriptionSet::new(log));
        let executor = Arc::new(QueryExecutor::new(
            store,
            Arc::clone(&subscriptions),
            config.subquery_timeout(),
            log,
        ));
        Self {
            executor,
            subscriptions,
            config: Arc::new(config),
            log,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        self.executor.store()
    }

    /// Number of subscriptions the live execution holds open
    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Starts executing `query`, superseding any previous execution.
    ///
    /// The stream yields one result per delivery and ends when the
    /// execution finishes or is superseded. Outside a tokio runtime the
    /// stream holds a single error result.
    pub fn execute(&self, query: &str, mode: ExecutionMode) -> ResultStream {
        let query = if self.config.strip_comments {
            clean_query(query)
        } else {
            query.to_string()
        };
        let query = query.trim().to_string();
        self.log.emit(Event::QueryReceived, &[("query", &query)]);

        let generation = self.subscriptions.begin(self.executor.store());

        let statement = match parse_statement(&query) {
            Ok(statement) => statement,
            Err(err) => {
                self.log.emit(
                    Event::QueryParseFailed,
                    &[("code", err.code().code()), ("message", &err.to_string())],
                );
                let header = ResultHeader::new(classify(&query), "", query);
                let (mut emitter, stream) = ResultEmitter::channel(header);
                emitter.error(&ExecutorError::from(err));
                return stream;
            }
        };

        let statement_type = statement.statement_type();
        let mode_name = match mode {
            ExecutionMode::Preview => "preview",
            ExecutionMode::Commit => "commit",
        };
        self.log.emit(
            Event::QueryParsed,
            &[
                ("mode", mode_name),
                ("path", statement.collection().as_str()),
                ("statement", statement_type.as_str()),
            ],
        );

        let header = ResultHeader::new(statement_type, statement.collection().as_str(), query)
            .with_order_bys(order_bys(&statement));
        let (mut emitter, stream) = ResultEmitter::channel(header);

        let Ok(runtime) = Handle::try_current() else {
            let err = ExecutorError::NoRuntime;
            self.log.emit(
                Event::ExecutionFailed,
                &[("code", err.code()), ("kind", err.kind().as_str())],
            );
            emitter.error(&err);
            return stream;
        };
        let task = runtime.spawn(run(
            Arc::clone(&self.executor),
            Arc::clone(&self.config),
            self.log,
            generation,
            mode,
            statement,
            emitter,
        ));
        self.subscriptions.track_task(generation, task.abort_handle());
        stream
    }

    /// Executes `query`, handing every result to `on_result`.
    ///
    /// The returned task finishes when the execution does. Outside a tokio
    /// runtime the error result is delivered before returning and there is
    /// no task.
    pub fn execute_with_callback<F>(
        &self,
        query: &str,
        mode: ExecutionMode,
        mut on_result: F,
    ) -> Option<JoinHandle<()>>
    where
        F: FnMut(ExecutionResult) + Send + 'static,
    {
        let mut stream = self.execute(query, mode);
        match Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(async move {
                while let Some(result) = stream.next().await {
                    on_result(result);
                }
            })),
            Err(_) => {
                while let Some(result) = stream.try_next() {
                    on_result(result);
                }
                None
            }
        }
    }

    /// Executes `query` and waits for its first result.
    ///
    /// A live preview keeps running afterwards until superseded or
    /// cancelled. `None` if the execution was superseded first.
    pub async fn execute_first(&self, query: &str, mode: ExecutionMode) -> Option<ExecutionResult> {
        self.execute(query, mode).next().await
    }

    /// Stops the live execution and closes its subscriptions.
    ///
    /// Returns the number of subscriptions closed.
    pub fn cancel(&self) -> usize {
        self.subscriptions.close_all(self.executor.store())
    }
}

fn order_bys(statement: &Statement) -> Option<Vec<crate::parser::OrderBySpec>> {
    match statement {
        Statement::Select(select) => select.order_by.clone(),
        _ => None,
    }
}

async fn run<S: DataStore + ?Sized + 'static>(
    executor: Arc<QueryExecutor<S>>,
    config: Arc<EngineConfig>,
    log: EventLog,
    generation: u64,
    mode: ExecutionMode,
    statement: Statement,
    mut emitter: ResultEmitter,
) {
    let runner = CommitExecutor::new(&executor, generation, mode, &config.placeholder_prefix);
    let err = match runner.run(&statement, &mut emitter).await {
        Ok(()) => return,
        Err(err) if err.is_cancelled() => return,
        Err(err) => err,
    };

    log.emit(
        Event::ExecutionFailed,
        &[
            ("code", err.code()),
            ("kind", err.kind().as_str()),
            ("message", &err.to_string()),
            ("path", statement.collection().as_str()),
        ],
    );
    emitter.error(&err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ErrorKind;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn engine(data: serde_json::Value) -> QueryEngine<MemoryStore> {
        QueryEngine::with_config(Arc::new(MemoryStore::with_data(data)), EngineConfig::quiet())
    }

    #[tokio::test]
    async fn test_select_with_comment() {
        let engine = engine(json!({"users": {"u1": {"name": "Joe"}}}));
        let result = engine
            .execute_first("select name from users -- everyone\n", ExecutionMode::Preview)
            .await
            .unwrap();

        assert_eq!(result.query, "select name from users");
        assert_eq!(result.payload, Some(json!("Joe")));
        assert_eq!(result.version, 1);
        assert!(result.subscription.is_some());
    }

    #[tokio::test]
    async fn test_parse_error_is_a_result() {
        let engine = engine(json!({}));
        let result = engine
            .execute_first("select * from users where age ~ 3", ExecutionMode::Preview)
            .await
            .unwrap();

        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Parse);
        assert!(result.payload.is_none());
        assert_eq!(engine.store().active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_order_by_attached_not_applied() {
        let engine = engine(json!({"users": {"a": {"age": 3}, "b": {"age": 1}}}));
        let result = engine
            .execute_first("select * from users order by age desc", ExecutionMode::Preview)
            .await
            .unwrap();

        assert_eq!(result.order_bys, Some(vec![crate::parser::OrderBySpec::desc("age")]));
        assert_eq!(result.payload, Some(json!({"a": {"age": 3}, "b": {"age": 1}})));
    }

    #[test]
    fn test_execute_without_runtime_is_an_error_result() {
        let engine = engine(json!({"users": {"a": {"age": 3}}}));
        let mut stream = engine.execute("select * from users", ExecutionMode::Preview);

        let result = stream.try_next().unwrap();
        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::Backend);
        assert_eq!(error.code, "BACKEND_NO_RUNTIME");
        assert!(stream.try_next().is_none());

        let mut delivered = Vec::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let task = engine.execute_with_callback("select * from users", ExecutionMode::Preview, move |r| {
            let _ = tx.send(r);
        });
        assert!(task.is_none());
        delivered.extend(rx.try_iter());
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].is_error());
    }

    #[tokio::test]
    async fn test_cancel_closes_subscriptions() {
        let engine = engine(json!({"users": {"a": {"age": 3}}}));
        let mut stream = engine.execute("select * from users", ExecutionMode::Preview);
        stream.next().await.unwrap();
        assert_eq!(engine.active_subscriptions(), 1);

        assert_eq!(engine.cancel(), 1);
        assert!(stream.next().await.is_none());
        assert_eq!(engine.store().active_subscriptions(), 0);
    }
}
