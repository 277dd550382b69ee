//! Query executor.
//!
//! A fetch resolves every nested select in its WHERE clause first. Nested
//! selects run concurrently; their results are joined by predicate index,
//! never by arrival order, and the outer subscription is only opened once
//! all of them have delivered. A nested select is a snapshot read: its
//! subscription is closed after the first delivery.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::Value;

use super::errors::{ExecutorError, ExecutorResult};
use super::filters::PredicateFilter;
use super::projection::project;
use super::subscriptions::SubscriptionSet;
use crate::observability::{Event, EventLog};
use crate::parser::{CollectionPath, Predicate, PredicateValue, ProjectionSet, SelectStatement};
use crate::planner::{Operand, PredicatePlan, ResolvedPredicate};
use crate::store::{DataStore, Snapshot, StoreQuery, Subscription, SubscriptionHandle};

/// Boxed future returned by recursive executor stages
pub type ExecFuture<'a, T> = Pin<Box<dyn Future<Output = ExecutorResult<T>> + Send + 'a>>;

/// Builds the store query for a plan: anchored when the plan has an anchor
pub fn store_query(path: &str, plan: &PredicatePlan) -> StoreQuery {
    let query = StoreQuery::at(path);
    match plan.anchor().and_then(|anchor| {
        anchor
            .operand
            .as_scalar()
            .map(|value| (anchor.field.clone(), value.clone()))
    }) {
        Some((field, value)) => query.equal_to(field, value),
        None => query,
    }
}

/// The open subscription behind a statement, with its residual filter
#[derive(Debug)]
pub struct PrimaryFetch {
    pub path: String,
    plan: PredicatePlan,
    filter: PredicateFilter,
    subscription: Subscription,
}

impl PrimaryFetch {
    pub fn handle(&self) -> SubscriptionHandle {
        self.subscription.handle
    }

    pub fn plan(&self) -> &PredicatePlan {
        &self.plan
    }

    /// Waits for the next delivery; `None` once the subscription is closed
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.subscription.receiver.recv().await
    }

    /// Applies the residual predicates to a delivery
    pub fn matched(&self, snapshot: Value) -> Value {
        matched(snapshot, &self.filter)
    }

    /// Residual filtering then projection
    pub fn select_payload(&self, snapshot: Value, projection: Option<&ProjectionSet>) -> Value {
        select_payload(snapshot, &self.filter, projection)
    }
}

fn matched(snapshot: Value, filter: &PredicateFilter) -> Value {
    if filter.is_empty() || snapshot.is_null() {
        return snapshot;
    }
    Value::Object(filter.filter_records(&snapshot))
}

fn select_payload(
    snapshot: Value,
    filter: &PredicateFilter,
    projection: Option<&ProjectionSet>,
) -> Value {
    let payload = matched(snapshot, filter);
    match projection {
        Some(projection) => project(payload, projection),
        None => payload,
    }
}

/// Drives fetches against a store on behalf of one engine
pub struct QueryExecutor<S: DataStore + ?Sized> {
    store: Arc<S>,
    subscriptions: Arc<SubscriptionSet>,
    subquery_timeout: Duration,
    log: EventLog,
}

impl<S: DataStore + ?Sized> QueryExecutor<S> {
    pub fn new(
        store: Arc<S>,
        subscriptions: Arc<SubscriptionSet>,
        subquery_timeout: Duration,
        log: EventLog,
    ) -> Self {
        Self {
            store,
            subscriptions,
            subquery_timeout,
            log,
        }
    }

    pub fn store(&self) -> &S {
        self.store.as_ref()
    }

    pub fn subscriptions(&self) -> &SubscriptionSet {
        &self.subscriptions
    }

    pub(crate) fn log(&self) -> EventLog {
        self.log
    }

    /// Resolves every predicate value, running nested selects concurrently.
    ///
    /// The output keeps the input order.
    pub fn resolve_predicates<'a>(
        &'a self,
        generation: u64,
        predicates: &'a [Predicate],
    ) -> ExecFuture<'a, Vec<ResolvedPredicate>> {
        Box::pin(async move {
            let pending = predicates
                .iter()
                .map(|predicate| self.resolve_predicate(generation, predicate));
            join_all(pending)
                .await
                .into_iter()
                .collect::<ExecutorResult<Vec<_>>>()
        })
    }

    async fn resolve_predicate(
        &self,
        generation: u64,
        predicate: &Predicate,
    ) -> ExecutorResult<ResolvedPredicate> {
        let operand = match &predicate.value {
            PredicateValue::Literal(literal) => Operand::Scalar(literal.to_value()),
            PredicateValue::Subquery(select) => {
                Operand::from_subquery(self.resolve_subquery(generation, select).await?)
            }
        };
        Ok(ResolvedPredicate {
            field: predicate.field.clone(),
            comparator: predicate.comparator,
            operand,
        })
    }

    /// Runs a nested select to its first delivery and returns its payload.
    pub fn resolve_subquery<'a>(
        &'a self,
        generation: u64,
        select: &'a SelectStatement,
    ) -> ExecFuture<'a, Value> {
        Box::pin(async move {
            let predicates = self.resolve_predicates(generation, &select.predicates).await?;
            let plan = PredicatePlan::optimize(predicates);
            let filter = PredicateFilter::new(plan.residual())?;
            let path = select.collection.as_str();

            let mut subscription = self.open(generation, store_query(path, &plan)).await?;
            let delivery =
                tokio::time::timeout(self.subquery_timeout, subscription.receiver.recv()).await;
            self.subscriptions.release(&subscription.handle, self.store());

            let snapshot = match delivery {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => return Err(self.ended(generation, path)),
                Err(_) => {
                    return Err(ExecutorError::SubqueryTimeout {
                        path: path.to_string(),
                        timeout_ms: self.subquery_timeout.as_millis() as u64,
                    })
                }
            };

            let payload = select_payload(snapshot.value, &filter, select.projection.as_ref());
            let members = match &payload {
                Value::Object(map) => map.len(),
                Value::Array(items) => items.len(),
                Value::Null => 0,
                _ => 1,
            }
            .to_string();
            self.log
                .emit(Event::SubqueryResolved, &[("path", path), ("members", &members)]);
            Ok(payload)
        })
    }

    /// Resolves predicates, plans the anchor and opens the statement's
    /// subscription.
    pub async fn open_primary(
        &self,
        generation: u64,
        collection: &CollectionPath,
        predicates: &[Predicate],
    ) -> ExecutorResult<PrimaryFetch> {
        let resolved = self.resolve_predicates(generation, predicates).await?;
        let plan = PredicatePlan::optimize(resolved);
        let filter = PredicateFilter::new(plan.residual())?;
        let path = collection.as_str().to_string();

        let subscription = self.open(generation, store_query(&path, &plan)).await?;
        Ok(PrimaryFetch {
            path,
            plan,
            filter,
            subscription,
        })
    }

    /// Waits for the first delivery of `fetch`, then closes it.
    pub async fn first_snapshot(
        &self,
        generation: u64,
        fetch: &mut PrimaryFetch,
    ) -> ExecutorResult<Snapshot> {
        let delivery = fetch.next_snapshot().await;
        self.release(fetch);
        match delivery {
            Some(snapshot) => {
                self.log_delivery(fetch);
                Ok(snapshot)
            }
            None => Err(self.ended(generation, &fetch.path)),
        }
    }

    /// Closes the subscription behind `fetch`
    pub fn release(&self, fetch: &PrimaryFetch) {
        self.subscriptions.release(&fetch.handle(), self.store());
    }

    pub(crate) fn log_delivery(&self, fetch: &PrimaryFetch) {
        let id = fetch.handle().to_string();
        self.log.emit(
            Event::DeliveryReceived,
            &[("path", &fetch.path), ("subscription", &id)],
        );
    }

    /// Error for a subscription that stopped delivering: cancellation when
    /// the execution was superseded, a backend failure otherwise.
    pub(crate) fn ended(&self, generation: u64, path: &str) -> ExecutorError {
        if self.subscriptions.is_current(generation) {
            ExecutorError::SubscriptionEnded(path.to_string())
        } else {
            ExecutorError::Cancelled
        }
    }

    /// Fails with `Cancelled` once `generation` is superseded
    pub(crate) fn ensure_current(&self, generation: u64) -> ExecutorResult<()> {
        if self.subscriptions.is_current(generation) {
            Ok(())
        } else {
            Err(ExecutorError::Cancelled)
        }
    }

    async fn open(&self, generation: u64, query: StoreQuery) -> ExecutorResult<Subscription> {
        self.ensure_current(generation)?;
        let path = query.path.clone();
        let subscription = self.store.open_subscription(query).await?;
        self.subscriptions
            .track(generation, subscription.handle, self.store())?;

        let id = subscription.handle.to_string();
        self.log
            .emit(Event::SubscriptionOpened, &[("path", &path), ("subscription", &id)]);
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_statement, Comparator, Statement};
    use crate::store::MemoryStore;
    use crate::value::FieldPath;
    use serde_json::json;

    fn executor(data: Value) -> (QueryExecutor<MemoryStore>, u64) {
        let store = Arc::new(MemoryStore::with_data(data));
        let subscriptions = Arc::new(SubscriptionSet::new(EventLog::disabled()));
        let generation = subscriptions.begin(store.as_ref());
        let executor = QueryExecutor::new(
            store,
            subscriptions,
            Duration::from_millis(500),
            EventLog::disabled(),
        );
        (executor, generation)
    }

    fn select(query: &str) -> SelectStatement {
        match parse_statement(query).unwrap() {
            Statement::Select(select) => select,
            other => panic!("expected select, got {:?}", other),
        }
    }

    fn data() -> Value {
        json!({
            "users": {
                "u1": {"name": "Joe", "age": 30, "team": "a"},
                "u2": {"name": "Ann", "age": 25, "team": "b"},
                "u3": {"name": "Bo", "age": 41, "team": "a"}
            },
            "teams": {
                "t1": {"id": "a", "active": true},
                "t2": {"id": "b", "active": false}
            }
        })
    }

    #[test]
    fn test_store_query_uses_anchor() {
        let plan = PredicatePlan::optimize(vec![
            ResolvedPredicate::scalar("age", Comparator::Gt, json!(3)),
            ResolvedPredicate::scalar("team", Comparator::Eq, json!("a")),
        ]);
        let query = store_query("users", &plan);
        assert_eq!(query.equal_to, Some((FieldPath::parse("team"), json!("a"))));

        let query = store_query("users", &PredicatePlan::default());
        assert!(query.equal_to.is_none());
    }

    #[tokio::test]
    async fn test_primary_fetch_filters_residuals() {
        let (executor, generation) = executor(data());
        let statement = select("select * from users where team = 'a' and age > 35");

        let mut fetch = executor
            .open_primary(generation, &statement.collection, &statement.predicates)
            .await
            .unwrap();
        let snapshot = fetch.next_snapshot().await.unwrap();

        assert_eq!(
            fetch.select_payload(snapshot.value, None),
            json!({"u3": {"name": "Bo", "age": 41, "team": "a"}})
        );
        assert_eq!(executor.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn test_subquery_resolves_to_value_set() {
        let (executor, generation) = executor(data());
        let statement = select("select * from users where team = (select id from teams where active = true)");

        let resolved = executor
            .resolve_predicates(generation, &statement.predicates)
            .await
            .unwrap();

        assert_eq!(resolved[0].operand, Operand::Scalar(json!("a")));
        // Nested selects do not stay subscribed
        assert_eq!(executor.store().active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_subquery_set_operand() {
        let (executor, generation) = executor(data());
        let statement = select("select * from users where team != (select id from teams)");

        let resolved = executor
            .resolve_predicates(generation, &statement.predicates)
            .await
            .unwrap();
        assert_eq!(resolved[0].operand, Operand::Set(vec![json!("a"), json!("b")]));
    }

    #[tokio::test]
    async fn test_predicates_keep_order() {
        let (executor, generation) = executor(data());
        let statement = select(
            "select * from users where age > 20 and team = (select id from teams where active = false) and name != 'Bo'",
        );

        let resolved = executor
            .resolve_predicates(generation, &statement.predicates)
            .await
            .unwrap();
        let fields: Vec<String> = resolved.iter().map(|p| p.field.to_string()).collect();
        assert_eq!(fields, vec!["age", "team", "name"]);
        assert_eq!(resolved[1].operand, Operand::Scalar(json!("b")));
    }

    #[tokio::test]
    async fn test_first_snapshot_releases() {
        let (executor, generation) = executor(data());
        let statement = select("select * from teams");
        let mut fetch = executor
            .open_primary(generation, &statement.collection, &statement.predicates)
            .await
            .unwrap();

        let snapshot = executor.first_snapshot(generation, &mut fetch).await.unwrap();
        assert_eq!(snapshot.path, "teams");
        assert!(executor.subscriptions().is_empty());
        assert_eq!(executor.store().active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_superseded_generation_is_cancelled() {
        let (executor, generation) = executor(data());
        executor.subscriptions().begin(executor.store());

        let statement = select("select * from users");
        let err = executor
            .open_primary(generation, &statement.collection, &statement.predicates)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_subquery_backend_failure() {
        let (executor, generation) = executor(data());
        executor.store().deny_reads("teams");
        let statement = select("select * from users where team = (select id from teams)");

        let err = executor
            .resolve_predicates(generation, &statement.predicates)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::executor::ErrorKind::Backend);
    }
}
