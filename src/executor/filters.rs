//! Comparator evaluation for client-side filtering.
//!
//! - `=` / `!=`: a missing field, `null` and the text `"null"` are all null;
//!   numbers compare by value, everything else exactly
//! - `<` `<=` `>` `>=`: numeric when both sides read as numbers, else
//!   chronological when both are dates, else by text length; on text
//!   lengths `>` holds for a value shorter than the bound, like `<`
//! - `like` / `!like`: `%` is any run, `_` is one character, anchored at
//!   both ends; regex metacharacters in the pattern are not escaped
//!
//! Against a subquery value set, the positive comparators hold when any
//! member satisfies them and the negated ones when none does.

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::{ExecutorError, ExecutorResult};
use crate::parser::{date_of, numeric, Comparator};
use crate::planner::{Operand, ResolvedPredicate};
use crate::value::{loosely_equal, scalar_text};

/// A predicate with its LIKE patterns compiled
#[derive(Debug)]
struct CompiledPredicate {
    predicate: ResolvedPredicate,
    /// One per operand member, `None` for members without text
    patterns: Vec<Option<Regex>>,
}

/// Evaluates residual predicates against records (AND semantics)
#[derive(Debug)]
pub struct PredicateFilter {
    predicates: Vec<CompiledPredicate>,
}

impl PredicateFilter {
    /// Compiles the LIKE patterns of `predicates`.
    pub fn new<'a>(
        predicates: impl IntoIterator<Item = &'a ResolvedPredicate>,
    ) -> ExecutorResult<Self> {
        let predicates = predicates
            .into_iter()
            .map(|predicate| {
                let patterns = match predicate.comparator {
                    Comparator::Like | Comparator::NotLike => members(&predicate.operand)
                        .map(|member| scalar_text(member).map(|text| like_regex(&text)).transpose())
                        .collect::<ExecutorResult<Vec<_>>>()?,
                    _ => Vec::new(),
                };
                Ok(CompiledPredicate {
                    predicate: predicate.clone(),
                    patterns,
                })
            })
            .collect::<ExecutorResult<Vec<_>>>()?;

        Ok(Self { predicates })
    }

    /// Returns true if no predicate needs evaluating
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Checks a record against every predicate
    pub fn matches(&self, record: &Value) -> bool {
        self.predicates.iter().all(|compiled| compiled.matches(record))
    }

    /// Keeps the children of `snapshot` that match. A non-object snapshot
    /// has no children and yields an empty map.
    pub fn filter_records(&self, snapshot: &Value) -> Map<String, Value> {
        match snapshot {
            Value::Object(children) => children
                .iter()
                .filter(|(_, record)| self.matches(record))
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
            _ => Map::new(),
        }
    }
}

impl CompiledPredicate {
    fn matches(&self, record: &Value) -> bool {
        let actual = self.predicate.field.resolve(record);
        let comparator = self.predicate.comparator;

        let any_member = members(&self.predicate.operand)
            .enumerate()
            .any(|(i, expected)| self.holds(comparator, actual, expected, i));

        if comparator.is_negated() {
            !any_member
        } else {
            any_member
        }
    }

    /// Positive form of the comparator against one operand member
    fn holds(&self, comparator: Comparator, actual: Option<&Value>, expected: &Value, i: usize) -> bool {
        match comparator {
            Comparator::Eq | Comparator::NotEq => equals(actual, expected),
            Comparator::Like | Comparator::NotLike => {
                match (actual.and_then(scalar_text), self.patterns.get(i)) {
                    (Some(text), Some(Some(regex))) => regex.is_match(&text),
                    _ => false,
                }
            }
            Comparator::Lt | Comparator::Lte | Comparator::Gt | Comparator::Gte => {
                in_range(comparator, actual, expected)
            }
        }
    }
}

fn members(operand: &Operand) -> Box<dyn Iterator<Item = &Value> + '_> {
    match operand {
        Operand::Scalar(value) => Box::new(std::iter::once(value)),
        Operand::Set(values) => Box::new(values.iter()),
    }
}

/// Translates a LIKE pattern into an anchored regex
pub fn like_regex(pattern: &str) -> ExecutorResult<Regex> {
    let translated = pattern.replace('%', ".*").replace('_', ".");
    Regex::new(&format!("^{}$", translated)).map_err(|e| ExecutorError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn is_null_like(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s == "null",
        _ => false,
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match (is_null_like(actual), is_null_like(Some(expected))) {
        (true, true) => true,
        (false, false) => actual.is_some_and(|a| loosely_equal(a, expected)),
        _ => false,
    }
}

/// How two range operands were ordered
enum Measure {
    /// Numbers or dates, in natural order
    Value(Ordering),
    /// Anything else, by character count
    Length(Ordering),
}

fn measure(actual: Option<&Value>, bound: &Value) -> Option<Measure> {
    let actual = actual.filter(|v| !v.is_null())?;
    if bound.is_null() {
        return None;
    }
    if let (Some(a), Some(b)) = (numeric(actual), numeric(bound)) {
        return a.partial_cmp(&b).map(Measure::Value);
    }
    if let (Some(a), Some(b)) = (date_of(actual), date_of(bound)) {
        return Some(Measure::Value(a.cmp(&b)));
    }
    let a = scalar_text(actual)?;
    let b = scalar_text(bound)?;
    Some(Measure::Length(a.chars().count().cmp(&b.chars().count())))
}

fn in_range(comparator: Comparator, actual: Option<&Value>, bound: &Value) -> bool {
    match (comparator, measure(actual, bound)) {
        (_, None) => false,
        // Text `>` holds when the value is shorter than the bound
        (Comparator::Gt, Some(Measure::Length(ordering))) => ordering.is_lt(),
        (Comparator::Lt, Some(Measure::Value(o) | Measure::Length(o))) => o.is_lt(),
        (Comparator::Lte, Some(Measure::Value(o) | Measure::Length(o))) => o.is_le(),
        (Comparator::Gt, Some(Measure::Value(o))) => o.is_gt(),
        (Comparator::Gte, Some(Measure::Value(o) | Measure::Length(o))) => o.is_ge(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldPath;
    use serde_json::json;

    fn filter(field: &str, comparator: Comparator, value: Value) -> PredicateFilter {
        PredicateFilter::new(&[ResolvedPredicate::scalar(field, comparator, value)]).unwrap()
    }

    fn set_filter(field: &str, comparator: Comparator, values: Vec<Value>) -> PredicateFilter {
        let predicate = ResolvedPredicate {
            field: FieldPath::parse(field),
            comparator,
            operand: Operand::Set(values),
        };
        PredicateFilter::new(&[predicate]).unwrap()
    }

    #[test]
    fn test_like_patterns() {
        let f = filter("name", Comparator::Like, json!("jo%"));
        assert!(f.matches(&json!({"name": "john"})));
        assert!(f.matches(&json!({"name": "jo"})));
        assert!(!f.matches(&json!({"name": "ajo"})));

        let f = filter("name", Comparator::Like, json!("j_e"));
        assert!(f.matches(&json!({"name": "joe"})));
        assert!(!f.matches(&json!({"name": "jooe"})));
    }

    #[test]
    fn test_not_like() {
        let f = filter("email", Comparator::NotLike, json!("%@test.com"));
        assert!(f.matches(&json!({"email": "a@real.org"})));
        assert!(!f.matches(&json!({"email": "a@test.com"})));
        // Missing field never matches the positive form
        assert!(f.matches(&json!({})));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = PredicateFilter::new(&[ResolvedPredicate::scalar(
            "name",
            Comparator::Like,
            json!("(%"),
        )])
        .unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidPattern { .. }));
    }

    #[test]
    fn test_equality_null_forms() {
        let f = filter("deleted", Comparator::Eq, Value::Null);
        assert!(f.matches(&json!({})));
        assert!(f.matches(&json!({"deleted": null})));
        assert!(f.matches(&json!({"deleted": "null"})));
        assert!(!f.matches(&json!({"deleted": false})));

        let f = filter("deleted", Comparator::NotEq, Value::Null);
        assert!(f.matches(&json!({"deleted": true})));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn test_equality_numbers_by_value() {
        let f = filter("age", Comparator::Eq, json!(30));
        assert!(f.matches(&json!({"age": 30.0})));
        assert!(!f.matches(&json!({"age": "30"})));
    }

    #[test]
    fn test_numeric_range() {
        let f = filter("age", Comparator::Gte, json!(18));
        assert!(f.matches(&json!({"age": 18})));
        assert!(f.matches(&json!({"age": "21"})));
        assert!(!f.matches(&json!({"age": 12})));
        assert!(!f.matches(&json!({"age": null})));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn test_iso_dates_chronological() {
        let f = filter("created", Comparator::Gt, json!("2017-01-15"));
        assert!(f.matches(&json!({"created": "2017-02-01"})));
        assert!(f.matches(&json!({"created": "2017-01-15T10:00:00Z"})));
        assert!(!f.matches(&json!({"created": "2016-12-31"})));
    }

    #[test]
    fn test_text_length_fallback() {
        let f = filter("name", Comparator::Lt, json!("abc"));
        assert!(f.matches(&json!({"name": "zz"})));
        assert!(!f.matches(&json!({"name": "abcd"})));

        let f = filter("name", Comparator::Gte, json!("abc"));
        assert!(f.matches(&json!({"name": "xyz"})));
        assert!(!f.matches(&json!({"name": "zz"})));
    }

    #[test]
    fn test_text_greater_than_matches_shorter_values() {
        let f = filter("name", Comparator::Gt, json!("abc"));
        assert!(f.matches(&json!({"name": "zz"})));
        assert!(!f.matches(&json!({"name": "abcd"})));
        assert!(!f.matches(&json!({"name": "xyz"})));

        // Numbers and dates keep natural order
        let f = filter("n", Comparator::Gt, json!(3));
        assert!(f.matches(&json!({"n": 10})));
    }

    #[test]
    fn test_nested_field() {
        let f = filter("address.city", Comparator::Eq, json!("Oslo"));
        assert!(f.matches(&json!({"address": {"city": "Oslo"}})));
        assert!(!f.matches(&json!({"address": "Oslo"})));
    }

    #[test]
    fn test_set_membership() {
        let f = set_filter("id", Comparator::Eq, vec![json!(1), json!(2)]);
        assert!(f.matches(&json!({"id": 2})));
        assert!(!f.matches(&json!({"id": 3})));

        let f = set_filter("id", Comparator::NotEq, vec![json!(1), json!(2)]);
        assert!(f.matches(&json!({"id": 3})));
        assert!(!f.matches(&json!({"id": 1})));

        let f = set_filter("id", Comparator::Eq, Vec::new());
        assert!(!f.matches(&json!({"id": 1})));
        let f = set_filter("id", Comparator::NotEq, Vec::new());
        assert!(f.matches(&json!({"id": 1})));
    }

    #[test]
    fn test_set_like() {
        let f = set_filter("name", Comparator::Like, vec![json!("a%"), json!(5), json!("b%")]);
        assert!(f.matches(&json!({"name": "bob"})));
        assert!(!f.matches(&json!({"name": "carl"})));
    }

    #[test]
    fn test_filter_records() {
        let f = PredicateFilter::new(&[
            ResolvedPredicate::scalar("age", Comparator::Gt, json!(20)),
            ResolvedPredicate::scalar("name", Comparator::Like, json!("A%")),
        ])
        .unwrap();

        let kept = f.filter_records(&json!({
            "k1": {"name": "Ann", "age": 25},
            "k2": {"name": "Al", "age": 19},
            "k3": {"name": "Bo", "age": 40}
        }));
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key("k1"));
        assert!(f.filter_records(&json!(5)).is_empty());
    }
}
