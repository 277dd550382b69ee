//! treequery - SQL-like statements over live, hierarchical key-value stores
//!
//! Statements are parsed, planned against a store that can filter on at
//! most one equality per fetch, and executed over push subscriptions,
//! either as a read-only preview or as a committed mutation.

pub mod engine;
pub mod executor;
pub mod observability;
pub mod parser;
pub mod planner;
pub mod store;
pub mod value;

pub use engine::{EngineConfig, ExecutionMode, QueryEngine};
pub use executor::{ErrorKind, ExecutionResult, ResultStream};
pub use store::{DataStore, MemoryStore};
