//! Query executor subsystem
//!
//! Runs parsed statements against a [`DataStore`](crate::store::DataStore):
//!
//! 1. Resolve nested selects in the WHERE clause, concurrently
//! 2. Pick the equality anchor and open the statement's subscription
//! 3. Filter each delivery with the residual predicates
//! 4. Project, or plan the mutation
//! 5. Emit a preview per delivery, or write once and emit a commit
//!
//! Results travel on a [`ResultStream`]. ORDER BY is attached to results,
//! never applied; [`ResultSorter`] applies it for callers that want it.

mod commit;
mod errors;
mod executor;
mod filters;
mod projection;
mod result;
mod sorter;
mod subscriptions;

pub use commit::{CommitExecutor, ExecutionMode};
pub use errors::{ErrorKind, ExecutorError, ExecutorResult, ResultError};
pub use executor::{store_query, ExecFuture, PrimaryFetch, QueryExecutor};
pub use filters::{like_regex, PredicateFilter};
pub use projection::project;
pub use result::{ExecutionResult, ResultEmitter, ResultHeader, ResultStream};
pub use sorter::ResultSorter;
pub use subscriptions::SubscriptionSet;
