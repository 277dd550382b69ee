//! Mutation planning.
//!
//! Planning is pure: it builds the records an UPDATE, INSERT or DELETE
//! would produce from a fetched snapshot, without writing anything.

use serde_json::{Map, Value};

use super::equation;
use super::errors::PlanResult;
use crate::parser::{Assignment, AssignmentValue, EquationRef, InsertTuple};
use crate::value::FieldPath;

/// Updated records keyed by their collection key
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdatePlan {
    pub records: Map<String, Value>,
    /// Assigned fields, in SET order, without duplicates
    pub assigned_fields: Vec<FieldPath>,
}

impl UpdatePlan {
    /// Preview payload
    pub fn payload(&self) -> Value {
        Value::Object(self.records.clone())
    }

    /// Field writes for one record, keyed `field/child` as the store
    /// expects. Missing when the record is not part of the plan.
    pub fn field_updates(&self, key: &str) -> Option<Map<String, Value>> {
        let record = self.records.get(key)?;
        let updates = self
            .assigned_fields
            .iter()
            .map(|field| {
                let value = field.resolve(record).cloned().unwrap_or(Value::Null);
                (field.to_store_path(), value)
            })
            .collect();
        Some(updates)
    }
}

/// Inserted records, keyed by placeholder until committed
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertPlan {
    pub records: Vec<(String, Value)>,
}

impl InsertPlan {
    /// Preview payload keyed by placeholder
    pub fn payload(&self) -> Value {
        Value::Object(self.records.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records a DELETE would remove
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeletePlan {
    pub records: Map<String, Value>,
}

impl DeletePlan {
    /// Preview payload
    pub fn payload(&self) -> Value {
        Value::Object(self.records.clone())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.records.keys()
    }
}

/// Applies every assignment to every matched record.
///
/// `matched` is the filtered snapshot, a map of key to record. Anything
/// else plans no updates.
pub fn plan_update(matched: &Value, assignments: &[Assignment]) -> PlanResult<UpdatePlan> {
    let mut assigned_fields: Vec<FieldPath> = Vec::new();
    for assignment in assignments {
        if !assigned_fields.contains(&assignment.field) {
            assigned_fields.push(assignment.field.clone());
        }
    }

    let mut records = Map::new();
    if let Value::Object(map) = matched {
        for (key, record) in map {
            let mut updated = record.clone();
            apply_assignments(&mut updated, assignments)?;
            records.insert(key.clone(), updated);
        }
    }

    Ok(UpdatePlan {
        records,
        assigned_fields,
    })
}

/// Applies assignments in SET order; later terms see earlier results.
pub fn apply_assignments(record: &mut Value, assignments: &[Assignment]) -> PlanResult<()> {
    for assignment in assignments {
        let value = match &assignment.value {
            AssignmentValue::Literal(literal) => literal.to_value(),
            AssignmentValue::Equation(equation) => evaluate_reference(equation, record)?,
        };
        assignment.field.assign(record, value);
    }
    Ok(())
}

fn evaluate_reference(equation: &EquationRef, record: &Value) -> PlanResult<Value> {
    if equation.is_arithmetic() {
        return equation::evaluate(equation.text(), record);
    }
    Ok(FieldPath::parse(equation.text())
        .resolve(record)
        .cloned()
        .unwrap_or(Value::Null))
}

/// Expands an INSERT tuple into new records.
///
/// With a replication count `N > 1`, `N - 1` clones of the first row come
/// first, followed by every literal row. Keys are `{prefix}{index}`.
pub fn plan_insert(tuple: &InsertTuple, placeholder_prefix: &str) -> InsertPlan {
    let rows: Vec<Value> = tuple
        .value_rows
        .iter()
        .map(|row| {
            let mut record = Value::Object(Map::new());
            for (column, literal) in tuple.columns.iter().zip(row) {
                FieldPath::parse(column).assign(&mut record, literal.to_value());
            }
            record
        })
        .collect();

    let clones = match rows.first() {
        Some(first) => vec![first.clone(); tuple.replication_count.saturating_sub(1) as usize],
        None => Vec::new(),
    };

    let records = clones
        .into_iter()
        .chain(rows)
        .enumerate()
        .map(|(i, record)| (format!("{}{}", placeholder_prefix, i), record))
        .collect();

    InsertPlan { records }
}

/// Marks every matched record for deletion.
pub fn plan_delete(matched: &Value) -> DeletePlan {
    let records = match matched {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    DeletePlan { records }
}
