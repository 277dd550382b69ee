//! Presentation ordering for callers.
//!
//! The executor attaches ORDER BY specs to results without applying them;
//! this helper applies them to a payload's top-level entries.

use std::cmp::Ordering;

use serde_json::Value;

use crate::parser::OrderBySpec;
use crate::value::FieldPath;

/// Orders result entries
pub struct ResultSorter;

impl ResultSorter {
    /// Returns the payload's top-level entries ordered by `order_bys`.
    ///
    /// Earlier specs take precedence; ties keep key order. A non-object
    /// payload has no entries.
    pub fn sorted_entries(payload: &Value, order_bys: &[OrderBySpec]) -> Vec<(String, Value)> {
        let Value::Object(records) = payload else {
            return Vec::new();
        };

        let fields: Vec<(FieldPath, bool)> = order_bys
            .iter()
            .map(|spec| (FieldPath::parse(&spec.field), spec.ascending))
            .collect();

        let mut entries: Vec<(String, Value)> =
            records.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        entries.sort_by(|(_, a), (_, b)| {
            for (field, ascending) in &fields {
                let ordering = Self::compare_values(field.resolve(a), field.resolve(b));
                let ordering = if *ascending { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        entries
    }

    /// Missing < null < bool < number < string < array < object; natural
    /// order within a type, arrays and objects equal.
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => {
                let rank = |v: &Value| -> u8 {
                    match v {
                        Value::Null => 0,
                        Value::Bool(_) => 1,
                        Value::Number(_) => 2,
                        Value::String(_) => 3,
                        Value::Array(_) => 4,
                        Value::Object(_) => 5,
                    }
                };

                match (a, b) {
                    (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                    (Value::Number(x), Value::Number(y)) => {
                        let x = x.as_f64().unwrap_or(0.0);
                        let y = y.as_f64().unwrap_or(0.0);
                        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                    }
                    (Value::String(x), Value::String(y)) => x.cmp(y),
                    _ => rank(a).cmp(&rank(b)),
                }
            }
        }
    }
}
