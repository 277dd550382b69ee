//! Query parser subsystem
//!
//! Turns a constrained SQL-like statement into a [`Statement`]:
//!
//! ```text
//! select [* | f1, f2] from <path> [where <term> and <term> ...] [order by f [desc], ...]
//! update <path> set f = <literal | field | equation>, ... [where ...]
//! insert [N] into <path> (c1, c2) values (v1, v2)[, (v1, v2) ...]
//! delete [from] <path> [where ...]
//! ```
//!
//! Path dots map to `/` separators. A WHERE value written in parentheses
//! is a nested select, resolved by the executor before filtering.

mod ast;
mod errors;
mod lexer;
mod literal;
mod parser;

pub use ast::{
    Assignment, AssignmentValue, CollectionPath, Comparator, DeleteStatement, EquationRef,
    InsertStatement, InsertTuple, OrderBySpec, Predicate, PredicateValue, ProjectionSet,
    SelectStatement, Statement, StatementType, UpdateStatement,
};
pub use errors::{ParseError, ParseErrorCode, ParseResult};
pub use lexer::clean_query;
pub use literal::{date_of, numeric, parse_date, Literal};
pub use parser::{classify, parse_statement, MAX_REPLICATION_COUNT};
