//! Predicate optimizer.
//!
//! The store executes exactly one server-side filter per fetch, and only an
//! equality filter is used as that native anchor. The first `=` predicate
//! with a non-null scalar value, in left-to-right order, is swapped to the
//! front. When none qualifies, a `NoEqualityAnchor` marker is prepended and
//! every predicate is evaluated client-side over the whole collection.

use serde_json::Value;

use crate::parser::Comparator;
use crate::value::FieldPath;

/// Right-hand side of a predicate once subqueries are resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A literal or a subquery that collapsed to one value
    Scalar(Value),
    /// The members of a subquery result
    Set(Vec<Value>),
}

impl Operand {
    /// Converts a subquery payload into an operand.
    ///
    /// Objects and arrays become sets of their members; null is the empty
    /// set; anything else is a scalar.
    pub fn from_subquery(payload: Value) -> Self {
        match payload {
            Value::Null => Operand::Set(Vec::new()),
            Value::Object(map) => Operand::Set(map.into_iter().map(|(_, v)| v).collect()),
            Value::Array(items) => Operand::Set(items),
            scalar => Operand::Scalar(scalar),
        }
    }

    /// Returns the scalar value, if any
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Operand::Scalar(v) => Some(v),
            Operand::Set(_) => None,
        }
    }
}

/// A WHERE term ready for evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPredicate {
    pub field: FieldPath,
    pub comparator: Comparator,
    pub operand: Operand,
}

impl ResolvedPredicate {
    /// Create a predicate over a scalar value
    pub fn scalar(field: &str, comparator: Comparator, value: Value) -> Self {
        Self {
            field: FieldPath::parse(field),
            comparator,
            operand: Operand::Scalar(value),
        }
    }

    /// Returns true if the store can execute this predicate natively
    pub fn is_anchor_candidate(&self) -> bool {
        self.comparator == Comparator::Eq
            && self.operand.as_scalar().is_some_and(|v| !v.is_null())
    }
}

/// Entry of an optimized predicate list
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedPredicate {
    /// Index-0 marker: fetch everything, filter client-side
    NoEqualityAnchor,
    Filter(ResolvedPredicate),
}

/// Optimized predicate list. Index 0 is the native anchor or the
/// `NoEqualityAnchor` marker; the rest are residual predicates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredicatePlan {
    entries: Vec<PlannedPredicate>,
}

impl PredicatePlan {
    /// Orders the predicates so the native anchor, if any, comes first.
    ///
    /// An empty list stays empty: the fetch is unfiltered.
    pub fn optimize(mut predicates: Vec<ResolvedPredicate>) -> Self {
        if predicates.is_empty() {
            return Self::default();
        }

        let mut entries = Vec::with_capacity(predicates.len() + 1);
        match predicates.iter().position(ResolvedPredicate::is_anchor_candidate) {
            Some(index) => predicates.swap(0, index),
            None => entries.push(PlannedPredicate::NoEqualityAnchor),
        }
        entries.extend(predicates.into_iter().map(PlannedPredicate::Filter));

        Self { entries }
    }

    /// All entries, in evaluation order
    pub fn entries(&self) -> &[PlannedPredicate] {
        &self.entries
    }

    /// The predicate executed by the store, if any
    pub fn anchor(&self) -> Option<&ResolvedPredicate> {
        match self.entries.first() {
            Some(PlannedPredicate::Filter(p)) => Some(p),
            _ => None,
        }
    }

    /// Predicates evaluated client-side after the fetch
    pub fn residual(&self) -> Vec<&ResolvedPredicate> {
        self.entries
            .iter()
            .skip(1)
            .filter_map(|entry| match entry {
                PlannedPredicate::Filter(p) => Some(p),
                PlannedPredicate::NoEqualityAnchor => None,
            })
            .collect()
    }

    /// Returns true if there is nothing to filter on
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
