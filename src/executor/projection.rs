//! Field projection.
//!
//! Every record keeps only the projected fields. A record reduced to its
//! single projected field collapses to that field's bare value, and a
//! result holding a single top-level key unwraps to that key's value.

use serde_json::{Map, Value};

use crate::parser::ProjectionSet;

/// Applies `projection` to a result payload.
pub fn project(payload: Value, projection: &ProjectionSet) -> Value {
    let Value::Object(records) = payload else {
        return payload;
    };

    let mut projected = Map::new();
    for (key, record) in records {
        match record {
            Value::Object(fields) => {
                projected.insert(key, project_record(fields, projection));
            }
            scalar => {
                if projection.contains(&key) {
                    projected.insert(key, scalar);
                }
            }
        }
    }

    if projected.len() == 1 {
        return projected.into_iter().next().map(|(_, only)| only).unwrap_or(Value::Null);
    }
    Value::Object(projected)
}

fn project_record(fields: Map<String, Value>, projection: &ProjectionSet) -> Value {
    let kept: Map<String, Value> = fields
        .into_iter()
        .filter(|(field, _)| projection.contains(field))
        .collect();

    match (projection.len(), kept.len()) {
        (1, 1) => kept.into_iter().next().map(|(_, value)| value).unwrap_or(Value::Null),
        _ => Value::Object(kept),
    }
}
