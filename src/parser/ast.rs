//! Parsed statement model.
//!
//! A statement is parsed once per submitted query string and is immutable
//! thereafter.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::literal::Literal;
use crate::value::FieldPath;

/// Statement kind, decided by the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementType {
    Select,
    Update,
    Insert,
    Delete,
}

impl StatementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementType::Select => "SELECT",
            StatementType::Update => "UPDATE",
            StatementType::Insert => "INSERT",
            StatementType::Delete => "DELETE",
        }
    }

    /// Returns true for statements that write on commit
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StatementType::Select)
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Collection path, `/`-separated (`a.b.c` is written `a/b/c`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Builds a path from a dotted or slashed reference.
    pub fn parse(reference: &str) -> Self {
        let path = reference
            .trim()
            .trim_end_matches(';')
            .split(['.', '/'])
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// WHERE comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "!like")]
    NotLike,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::NotEq => "!=",
            Comparator::Lt => "<",
            Comparator::Lte => "<=",
            Comparator::Gt => ">",
            Comparator::Gte => ">=",
            Comparator::Like => "like",
            Comparator::NotLike => "!like",
        }
    }

    /// Returns true for the two negated comparators
    pub fn is_negated(&self) -> bool {
        matches!(self, Comparator::NotEq | Comparator::NotLike)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Right-hand side of a WHERE term
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Literal(Literal),
    /// Parenthesized nested select, resolved by the executor
    Subquery(Box<SelectStatement>),
}

/// A single WHERE term
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: FieldPath,
    pub comparator: Comparator,
    pub value: PredicateValue,
}

/// Textual SET expression: an arithmetic equation over fields of the same
/// record, or a (possibly dotted) reference to one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquationRef(String);

/// Operators that mark an expression as arithmetic when spaced on both sides
const EQUATION_OPERATORS: [&str; 4] = [" + ", " - ", " * ", " / "];

impl EquationRef {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Returns true if the text contains a spaced arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        EQUATION_OPERATORS.iter().any(|op| self.0.contains(op))
    }
}

/// Right-hand side of a SET term
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentValue {
    Literal(Literal),
    Equation(EquationRef),
}

/// A single SET term
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: FieldPath,
    pub value: AssignmentValue,
}

/// ORDER BY term. Applied by the caller, never by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBySpec {
    pub field: String,
    pub ascending: bool,
}

impl OrderBySpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: true,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ascending: false,
        }
    }
}

/// Projected top-level field names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectionSet(BTreeSet<String>);

impl ProjectionSet {
    pub fn new(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

/// INSERT columns and value rows.
///
/// Every row has exactly as many values as there are columns.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertTuple {
    pub columns: Vec<String>,
    pub value_rows: Vec<Vec<Literal>>,
    /// `insert <N> into ...`; always at least 1
    pub replication_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub collection: CollectionPath,
    pub projection: Option<ProjectionSet>,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<Vec<OrderBySpec>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub collection: CollectionPath,
    pub assignments: Vec<Assignment>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub collection: CollectionPath,
    pub tuple: InsertTuple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub collection: CollectionPath,
    pub predicates: Vec<Predicate>,
}

/// A parsed statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Insert(InsertStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn statement_type(&self) -> StatementType {
        match self {
            Statement::Select(_) => StatementType::Select,
            Statement::Update(_) => StatementType::Update,
            Statement::Insert(_) => StatementType::Insert,
            Statement::Delete(_) => StatementType::Delete,
        }
    }

    pub fn collection(&self) -> &CollectionPath {
        match self {
            Statement::Select(s) => &s.collection,
            Statement::Update(s) => &s.collection,
            Statement::Insert(s) => &s.collection,
            Statement::Delete(s) => &s.collection,
        }
    }

    /// WHERE terms; empty for inserts
    pub fn predicates(&self) -> &[Predicate] {
        match self {
            Statement::Select(s) => &s.predicates,
            Statement::Update(s) => &s.predicates,
            Statement::Delete(s) => &s.predicates,
            Statement::Insert(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_path_dots() {
        assert_eq!(CollectionPath::parse("a.b.c").as_str(), "a/b/c");
        assert_eq!(CollectionPath::parse("users;").as_str(), "users");
    }

    #[test]
    fn test_equation_detection() {
        assert!(EquationRef::new("price * qty").is_arithmetic());
        assert!(EquationRef::new("level + 1").is_arithmetic());
        assert!(!EquationRef::new("address.city").is_arithmetic());
        assert!(!EquationRef::new("first-name").is_arithmetic());
    }

    #[test]
    fn test_statement_type_serialization() {
        let json = serde_json::to_string(&StatementType::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        assert!(StatementType::Insert.is_mutation());
        assert!(!StatementType::Select.is_mutation());
    }

    #[test]
    fn test_projection_set() {
        let projection = ProjectionSet::new(["name", "age", "name"]);
        assert_eq!(projection.len(), 2);
        assert!(projection.contains("age"));
    }
}
