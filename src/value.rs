//! JSON tree helpers shared by the parser, executor and store.
//!
//! Records are `serde_json::Value` trees. Field references walk one
//! property at a time; collection paths are `/`-separated.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A field reference inside a record, e.g. `address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parses a dotted field reference. Empty segments are dropped.
    pub fn parse(dotted: &str) -> Self {
        Self(
            dotted
                .trim()
                .split(['.', '/'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }

    /// Returns the path segments
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns true if the path has no segments
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders the path with `/` separators, as used by the store
    pub fn to_store_path(&self) -> String {
        self.0.join("/")
    }

    /// Walks the record one property at a time.
    pub fn resolve<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        let mut current = record;
        for segment in &self.0 {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Writes `value` at this path, creating intermediate objects.
    ///
    /// Non-object intermediates are replaced by objects.
    pub fn assign(&self, record: &mut Value, value: Value) {
        let Some((last, parents)) = self.0.split_last() else {
            return;
        };
        let mut current = record;
        for segment in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = match current {
                Value::Object(map) => map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => return,
            };
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Value::Object(map) = current {
            map.insert(last.clone(), value);
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_store_path())
    }
}

/// Splits a store path into its non-empty segments.
pub fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Normalizes a store path: no leading, trailing or doubled separators.
pub fn normalize_path(path: &str) -> String {
    path_segments(path).collect::<Vec<_>>().join("/")
}

/// Joins a collection path and a child key.
pub fn child_path(parent: &str, key: &str) -> String {
    let parent = normalize_path(parent);
    if parent.is_empty() {
        normalize_path(key)
    } else {
        format!("{}/{}", parent, normalize_path(key))
    }
}

/// Equality that treats numbers by value (`5 == 5.0`) and everything else
/// structurally.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Converts an arithmetic result into a JSON number.
///
/// Integral results become integers. Returns `None` for NaN and infinities,
/// which JSON cannot carry.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Some(Value::Number(Number::from(n as i64)));
    }
    Number::from_f64(n).map(Value::Number)
}

/// Textual rendering of a scalar, as used by LIKE and length comparisons.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
