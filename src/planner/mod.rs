//! Planner subsystem
//!
//! Two pure stages between parsing and execution:
//!
//! - Predicate optimization: choose the single WHERE term the store can
//!   execute natively and leave the rest for client-side filtering.
//! - Mutation planning: turn a fetched snapshot into the records an UPDATE,
//!   INSERT or DELETE would write.
//!
//! # Anchor selection
//!
//! 1. First `=` predicate with a non-null scalar value
//! 2. Otherwise `NoEqualityAnchor`: fetch the whole collection
//!
//! Nothing here touches the store.

mod equation;
mod errors;
mod mutation;
mod optimizer;

pub use equation::evaluate as evaluate_equation;
pub use errors::{PlanError, PlanResult};
pub use mutation::{
    apply_assignments, plan_delete, plan_insert, plan_update, DeletePlan, InsertPlan, UpdatePlan,
};
pub use optimizer::{Operand, PlannedPredicate, PredicatePlan, ResolvedPredicate};
