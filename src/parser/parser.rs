//! Clause parser.
//!
//! Pure transformation from query text to a [`Statement`]. Keywords are
//! found at parenthesis depth zero only, so a nested select keeps its own
//! `where`/`order by` text. WHERE terms are split on the lowercase word
//! `and`; OR, NOT and grouping parentheses are not part of the grammar and
//! produce whatever split the `and` rule yields.

use super::ast::{
    Assignment, AssignmentValue, CollectionPath, Comparator, DeleteStatement, EquationRef,
    InsertStatement, InsertTuple, OrderBySpec, Predicate, PredicateValue, ProjectionSet,
    SelectStatement, Statement, StatementType, UpdateStatement,
};
use super::errors::{ParseError, ParseResult};
use super::lexer::{Lexer, Token, TokenKind};
use super::literal::Literal;
use crate::value::FieldPath;

/// Classifies a statement by its first whitespace-delimited token.
///
/// Anything that is not `update`, `insert` or `delete` is a select,
/// including garbage input.
pub fn classify(query: &str) -> StatementType {
    let first = query
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match first.as_str() {
        "update" => StatementType::Update,
        "insert" => StatementType::Insert,
        "delete" => StatementType::Delete,
        _ => StatementType::Select,
    }
}

/// Parses a query string into a statement.
pub fn parse_statement(query: &str) -> ParseResult<Statement> {
    let tokens = Lexer::new(query).tokenize()?;
    let end = find_top_level(&tokens, 0, |t| t.kind == TokenKind::Semicolon).unwrap_or(tokens.len());
    let tokens = &tokens[..end];
    let parser = Parser { source: query };

    match classify(query) {
        StatementType::Select => parser.parse_select(tokens).map(Statement::Select),
        StatementType::Update => parser.parse_update(tokens).map(Statement::Update),
        StatementType::Insert => parser.parse_insert(tokens).map(Statement::Insert),
        StatementType::Delete => parser.parse_delete(tokens).map(Statement::Delete),
    }
}

struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Source text spanned by the tokens
    fn text(&self, tokens: &[Token]) -> &'a str {
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => self.source[first.start..last.end].trim(),
            _ => "",
        }
    }

    fn parse_select(&self, tokens: &[Token]) -> ParseResult<SelectStatement> {
        let starts_with_select = tokens.first().is_some_and(|t| t.is_keyword("select"));
        let from = find_top_level(tokens, 0, |t| t.is_keyword("from"));

        let (projection, collection_index) = match from {
            Some(index) if starts_with_select => (self.parse_projection(&tokens[1..index]), index + 1),
            Some(index) => (None, index + 1),
            None if starts_with_select => {
                return Err(ParseError::invalid_collection(
                    "Error determining collection: select without from.",
                ))
            }
            None => (None, 0),
        };

        let collection = self.parse_collection(tokens, collection_index)?;
        let (predicates, order_by) = self.parse_tail(&tokens[collection_index + 1..])?;

        Ok(SelectStatement {
            collection,
            projection,
            predicates,
            order_by,
        })
    }

    fn parse_update(&self, tokens: &[Token]) -> ParseResult<UpdateStatement> {
        let collection = self.parse_collection(tokens, 1)?;

        let set = find_top_level(tokens, 2, |t| t.is_keyword("set"))
            .ok_or_else(|| ParseError::invalid_set("Update statement requires a SET clause"))?;
        let set_end = find_top_level(tokens, set + 1, |t| t.is_keyword("where")).unwrap_or(tokens.len());

        let set_tokens = &tokens[set + 1..set_end];
        if set_tokens.is_empty() {
            return Err(ParseError::invalid_set("SET clause has no assignments"));
        }
        let assignments = split_top_level(set_tokens, |t| t.kind == TokenKind::Comma)
            .into_iter()
            .map(|item| self.parse_assignment(item))
            .collect::<ParseResult<Vec<_>>>()?;

        let (predicates, _) = self.parse_tail(&tokens[set_end..])?;

        Ok(UpdateStatement {
            collection,
            assignments,
            predicates,
        })
    }

    fn parse_insert(&self, tokens: &[Token]) -> ParseResult<InsertStatement> {
        let count = tokens
            .get(1)
            .and_then(Token::word)
            .and_then(|w| w.parse::<u64>().ok());
        let replication_count = match count {
            Some(n) if n > u64::from(MAX_REPLICATION_COUNT) => {
                return Err(ParseError::invalid_insert(format!(
                    "Insert count {} exceeds the limit of {}",
                    n, MAX_REPLICATION_COUNT
                )))
            }
            Some(n) if n > 1 => n as u32,
            _ => 1,
        };

        let collection_index = match find_top_level(tokens, 1, |t| t.is_keyword("into")) {
            Some(into) => into + 1,
            None if count.is_some() => 2,
            None => 1,
        };
        let collection = self.parse_collection(tokens, collection_index)?;

        let columns_open = collection_index + 1;
        if tokens.get(columns_open).map(|t| &t.kind) != Some(&TokenKind::LParen) {
            return Err(ParseError::invalid_insert(
                "Badly formatted insert statement: expected a column list after the collection",
            ));
        }
        let columns_close = matching_paren(tokens, columns_open).ok_or_else(|| {
            ParseError::invalid_insert("Badly formatted insert statement: unclosed column list")
        })?;
        let columns = split_top_level(&tokens[columns_open + 1..columns_close], |t| {
            t.kind == TokenKind::Comma
        })
        .into_iter()
        .map(|column| match column {
            [Token {
                kind: TokenKind::Str(name),
                ..
            }] => Ok(name.clone()),
            _ => match self.text(column) {
                "" => Err(ParseError::invalid_insert("Empty column name in insert statement")),
                name => Ok(name.to_string()),
            },
        })
        .collect::<ParseResult<Vec<_>>>()?;

        let values = find_top_level(tokens, columns_close + 1, |t| t.is_keyword("values"))
            .ok_or_else(|| {
                ParseError::invalid_insert("Badly formatted insert statement: missing VALUES")
            })?;

        let mut value_rows = Vec::new();
        let mut cursor = values + 1;
        while cursor < tokens.len() {
            match tokens[cursor].kind {
                TokenKind::Comma => cursor += 1,
                TokenKind::LParen => {
                    let close = matching_paren(tokens, cursor).ok_or_else(|| {
                        ParseError::invalid_insert("Badly formatted insert statement: unclosed value group")
                    })?;
                    let row = self.parse_value_row(&tokens[cursor + 1..close]);
                    if row.len() != columns.len() {
                        return Err(ParseError::invalid_insert(format!(
                            "Value group {} has {} values but {} columns are listed",
                            value_rows.len() + 1,
                            row.len(),
                            columns.len()
                        )));
                    }
                    value_rows.push(row);
                    cursor = close + 1;
                }
                _ => {
                    return Err(ParseError::invalid_insert(format!(
                        "Unexpected '{}' after VALUES",
                        self.text(&tokens[cursor..=cursor])
                    )))
                }
            }
        }
        if value_rows.is_empty() {
            return Err(ParseError::invalid_insert(
                "Badly formatted insert statement: no value groups",
            ));
        }

        Ok(InsertStatement {
            collection,
            tuple: InsertTuple {
                columns,
                value_rows,
                replication_count,
            },
        })
    }

    fn parse_delete(&self, tokens: &[Token]) -> ParseResult<DeleteStatement> {
        let collection_index = match tokens.get(1) {
            Some(t) if t.is_keyword("from") => 2,
            _ => 1,
        };
        let collection = self.parse_collection(tokens, collection_index)?;
        let (predicates, _) = self.parse_tail(&tokens[collection_index + 1..])?;

        Ok(DeleteStatement {
            collection,
            predicates,
        })
    }

    fn parse_collection(&self, tokens: &[Token], index: usize) -> ParseResult<CollectionPath> {
        let reference = match tokens.get(index).map(|t| &t.kind) {
            Some(TokenKind::Word(w)) if !is_reserved(w) => w.as_str(),
            Some(TokenKind::Str(s)) => s.as_str(),
            _ => {
                return Err(ParseError::invalid_collection(
                    "Error determining collection.",
                ))
            }
        };
        let collection = CollectionPath::parse(reference);
        if collection.is_empty() {
            return Err(ParseError::invalid_collection(format!(
                "Invalid collection reference '{}'",
                reference
            )));
        }
        Ok(collection)
    }

    /// `select a, b` field list; `None` for `*` or an empty list
    fn parse_projection(&self, tokens: &[Token]) -> Option<ProjectionSet> {
        if tokens.is_empty() || tokens[0].word() == Some("*") {
            return None;
        }
        let fields: Vec<&str> = split_top_level(tokens, |t| t.kind == TokenKind::Comma)
            .into_iter()
            .map(|field| self.text(field))
            .filter(|field| !field.is_empty())
            .collect();
        if fields.is_empty() {
            None
        } else {
            Some(ProjectionSet::new(fields))
        }
    }

    /// Trailing `where ... order by ...`
    fn parse_tail(
        &self,
        tokens: &[Token],
    ) -> ParseResult<(Vec<Predicate>, Option<Vec<OrderBySpec>>)> {
        let order = find_top_level_at(tokens, 0, |i| {
            tokens[i].is_keyword("order") && tokens.get(i + 1).is_some_and(|t| t.is_keyword("by"))
        });
        let clause_end = order.unwrap_or(tokens.len());

        let predicates = match find_top_level(&tokens[..clause_end], 0, |t| t.is_keyword("where")) {
            Some(index) => self.parse_where(&tokens[index + 1..clause_end])?,
            None => Vec::new(),
        };
        let order_by = order.map(|index| self.parse_order_by(&tokens[index + 2..]));

        Ok((predicates, order_by))
    }

    fn parse_where(&self, tokens: &[Token]) -> ParseResult<Vec<Predicate>> {
        if tokens.is_empty() {
            return Err(ParseError::invalid_where("Empty where clause"));
        }
        split_top_level(tokens, |t| t.word() == Some("and"))
            .into_iter()
            .map(|term| self.parse_predicate(term))
            .collect()
    }

    fn parse_predicate(&self, tokens: &[Token]) -> ParseResult<Predicate> {
        let term = self.text(tokens);
        if tokens.is_empty() {
            return Err(ParseError::invalid_where("Empty condition in where clause"));
        }
        let (comparator, index, width) =
            find_comparator(tokens).ok_or_else(|| ParseError::unrecognized_comparator(term))?;

        let field = FieldPath::parse(self.text(&tokens[..index]));
        if field.is_empty() {
            return Err(ParseError::invalid_where(format!(
                "Missing field before '{}' in where clause: '{}'",
                comparator, term
            )));
        }

        let value_tokens = &tokens[index + width..];
        let value = match value_tokens {
            [] => {
                return Err(ParseError::invalid_where(format!(
                    "Missing value after '{}' in where clause: '{}'",
                    comparator, term
                )))
            }
            [first, .., _] if first.kind == TokenKind::LParen
                && matching_paren(value_tokens, 0) == Some(value_tokens.len() - 1) =>
            {
                PredicateValue::Subquery(Box::new(self.parse_subquery(&value_tokens[1..value_tokens.len() - 1])?))
            }
            literal => PredicateValue::Literal(self.parse_literal(literal)),
        };

        Ok(Predicate {
            field,
            comparator,
            value,
        })
    }

    fn parse_subquery(&self, tokens: &[Token]) -> ParseResult<SelectStatement> {
        let verb = tokens.first().and_then(Token::word).unwrap_or_default();
        if classify(verb) != StatementType::Select {
            return Err(ParseError::invalid_subquery(format!(
                "Nested statements must be selects: '({})'",
                self.text(tokens)
            )));
        }
        self.parse_select(tokens).map_err(|err| {
            ParseError::invalid_subquery(format!(
                "Invalid nested select '({})': {}",
                self.text(tokens),
                err.message()
            ))
        })
    }

    fn parse_assignment(&self, tokens: &[Token]) -> ParseResult<Assignment> {
        let eq = find_top_level(tokens, 0, |t| t.is_symbol("=")).ok_or_else(|| {
            ParseError::invalid_set(format!("Malformed assignment '{}'", self.text(tokens)))
        })?;

        let field = FieldPath::parse(self.text(&tokens[..eq]));
        if field.is_empty() {
            return Err(ParseError::invalid_set(format!(
                "Missing field in assignment '{}'",
                self.text(tokens)
            )));
        }

        let value = match &tokens[eq + 1..] {
            [] => {
                return Err(ParseError::invalid_set(format!(
                    "Missing value in assignment '{}'",
                    self.text(tokens)
                )))
            }
            [Token {
                kind: TokenKind::Str(s),
                ..
            }] => AssignmentValue::Literal(Literal::from_quoted(s)),
            [single] => match Literal::parse(self.text(std::slice::from_ref(single))) {
                Literal::String(text) => AssignmentValue::Equation(EquationRef::new(text)),
                literal => AssignmentValue::Literal(literal),
            },
            expression => AssignmentValue::Equation(EquationRef::new(self.text(expression))),
        };

        Ok(Assignment { field, value })
    }

    fn parse_value_row(&self, tokens: &[Token]) -> Vec<Literal> {
        if tokens.is_empty() {
            return Vec::new();
        }
        split_top_level(tokens, |t| t.kind == TokenKind::Comma)
            .into_iter()
            .map(|value| self.parse_literal(value))
            .collect()
    }

    fn parse_literal(&self, tokens: &[Token]) -> Literal {
        match tokens {
            [Token {
                kind: TokenKind::Str(s),
                ..
            }] => Literal::from_quoted(s),
            _ => Literal::parse(self.text(tokens)),
        }
    }

    fn parse_order_by(&self, tokens: &[Token]) -> Vec<OrderBySpec> {
        split_top_level(tokens, |t| t.kind == TokenKind::Comma)
            .into_iter()
            .filter_map(|term| {
                let field = match &term.first()?.kind {
                    TokenKind::Word(w) => w.clone(),
                    TokenKind::Str(s) => s.clone(),
                    _ => return None,
                };
                // Any `desc` in the term, in any case, sorts descending
                let descending = self.text(term).to_ascii_lowercase().contains("desc");
                Some(OrderBySpec {
                    field,
                    ascending: !descending,
                })
            })
            .collect()
    }
}

/// Largest `insert N into ...` count accepted
pub const MAX_REPLICATION_COUNT: u32 = 10_000;

/// Keywords that can never name a collection
fn is_reserved(word: &str) -> bool {
    ["select", "from", "where", "set", "into", "values", "order"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

/// Finds the comparator of a WHERE term by fixed precedence:
/// `!=`/`<>`, `>=`, `>`, `<=`, `<`, `!like`, `like`, `=`.
///
/// Returns the comparator, its token index and how many tokens it spans.
fn find_comparator(tokens: &[Token]) -> Option<(Comparator, usize, usize)> {
    let symbol = |symbols: &[&str]| find_top_level(tokens, 0, |t| symbols.iter().any(|s| t.is_symbol(s)));

    if let Some(i) = symbol(&["!=", "<>"][..]) {
        return Some((Comparator::NotEq, i, 1));
    }
    for (symbols, comparator) in [
        (&[">="][..], Comparator::Gte),
        (&[">"][..], Comparator::Gt),
        (&["<="][..], Comparator::Lte),
        (&["<"][..], Comparator::Lt),
    ] {
        if let Some(i) = symbol(symbols) {
            return Some((comparator, i, 1));
        }
    }
    if let Some(i) = find_top_level_at(tokens, 0, |i| {
        tokens[i].is_keyword("!like")
            || (tokens[i].is_keyword("not") && tokens.get(i + 1).is_some_and(|t| t.is_keyword("like")))
    }) {
        let width = if tokens[i].is_keyword("not") { 2 } else { 1 };
        return Some((Comparator::NotLike, i, width));
    }
    if let Some(i) = find_top_level(tokens, 0, |t| t.is_keyword("like")) {
        return Some((Comparator::Like, i, 1));
    }
    symbol(&["="][..]).map(|i| (Comparator::Eq, i, 1))
}

/// First token at parenthesis depth zero matching `matches`, from `from`.
fn find_top_level(
    tokens: &[Token],
    from: usize,
    matches: impl Fn(&Token) -> bool,
) -> Option<usize> {
    find_top_level_at(tokens, from, |i| matches(&tokens[i]))
}

/// Like [`find_top_level`], with the predicate given the token index for
/// lookahead.
fn find_top_level_at(
    tokens: &[Token],
    from: usize,
    matches: impl Fn(usize) -> bool,
) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(from) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && matches(i) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits on separators at depth zero. Empty segments are kept.
fn split_top_level(tokens: &[Token], is_separator: impl Fn(&Token) -> bool) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && is_separator(token) => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn select(query: &str) -> SelectStatement {
        match parse_statement(query).unwrap() {
            Statement::Select(s) => s,
            other => panic!("expected select, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_defaults_to_select() {
        assert_eq!(classify("UPDATE users set a = 1"), StatementType::Update);
        assert_eq!(classify("  insert into t (a) values (1)"), StatementType::Insert);
        assert_eq!(classify("Delete from t"), StatementType::Delete);
        assert_eq!(classify("select * from t"), StatementType::Select);
        assert_eq!(classify("users"), StatementType::Select);
        assert_eq!(classify("%%garbage%%"), StatementType::Select);
        assert_eq!(classify(""), StatementType::Select);
    }

    #[test]
    fn test_collection_forms() {
        assert_eq!(select("select * from a.b.c").collection.as_str(), "a/b/c");
        assert_eq!(select("users;").collection.as_str(), "users");
        assert_eq!(select("from users").collection.as_str(), "users");
        assert_eq!(
            select("select * from users;").collection.as_str(),
            "users"
        );
    }

    #[test]
    fn test_select_without_from_fails() {
        let err = parse_statement("select name").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_COLLECTION");
    }

    #[test]
    fn test_projection() {
        assert!(select("select * from users").projection.is_none());
        let s = select("select name, age from users");
        let projection = s.projection.unwrap();
        assert!(projection.contains("name"));
        assert!(projection.contains("age"));
        assert_eq!(projection.len(), 2);
    }

    #[test]
    fn test_where_terms_and_comparators() {
        let s = select("select * from users where age >= 18 and name like 'jo%' and x <> 1");
        let comparators: Vec<_> = s.predicates.iter().map(|p| p.comparator).collect();
        assert_eq!(
            comparators,
            vec![Comparator::Gte, Comparator::Like, Comparator::NotEq]
        );
        assert_eq!(s.predicates[0].field, FieldPath::parse("age"));
        match &s.predicates[1].value {
            PredicateValue::Literal(l) => assert_eq!(l.to_value(), json!("jo%")),
            _ => panic!("expected literal"),
        }
    }

    #[test]
    fn test_not_like_normalized() {
        let s = select("select * from users where name not like 'j_e' and b !like 'x%'");
        assert_eq!(s.predicates[0].comparator, Comparator::NotLike);
        assert_eq!(s.predicates[0].field, FieldPath::parse("name"));
        assert_eq!(s.predicates[1].comparator, Comparator::NotLike);
    }

    #[test]
    fn test_dotted_where_field() {
        let s = select("select * from users where address.city = 'Oslo'");
        assert_eq!(s.predicates[0].field.to_store_path(), "address/city");
    }

    #[test]
    fn test_unrecognized_comparator() {
        let err = parse_statement("select * from users where age ~ 3").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_COMPARATOR");
        assert!(err.message().contains("age ~ 3"));
    }

    #[test]
    fn test_uppercase_and_is_not_a_separator() {
        let s = select("select * from t where a = 1 AND b = 2");
        assert_eq!(s.predicates.len(), 1);
        assert_eq!(s.predicates[0].comparator, Comparator::Eq);
    }

    #[test]
    fn test_subquery_captured_whole() {
        let s = select(
            "select * from users where id != (select id from banned where reason = 'x' order by id) order by name desc",
        );
        assert_eq!(s.predicates.len(), 1);
        match &s.predicates[0].value {
            PredicateValue::Subquery(inner) => {
                assert_eq!(inner.collection.as_str(), "banned");
                assert_eq!(inner.predicates.len(), 1);
                assert_eq!(inner.order_by, Some(vec![OrderBySpec::asc("id")]));
            }
            _ => panic!("expected subquery"),
        }
        assert_eq!(s.order_by, Some(vec![OrderBySpec::desc("name")]));
    }

    #[test]
    fn test_order_by() {
        let s = select("select * from users ORDER BY level DESC, name;");
        assert_eq!(
            s.order_by,
            Some(vec![OrderBySpec::desc("level"), OrderBySpec::asc("name")])
        );
    }

    #[test]
    fn test_order_by_desc_anywhere_in_term() {
        let s = select("select * from users order by score DeSc, name, rank_desc");
        assert_eq!(
            s.order_by,
            Some(vec![
                OrderBySpec::desc("score"),
                OrderBySpec::asc("name"),
                OrderBySpec::desc("rank_desc"),
            ])
        );
    }

    #[test]
    fn test_insert_count_limit() {
        let err = parse_statement("insert 4000000000 into t (a) values (1)").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_INSERT");
        let err = parse_statement("insert 99999999999 into t (a) values (1)").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_INSERT");

        let at_limit = format!("insert {} into t (a) values (1)", MAX_REPLICATION_COUNT);
        assert!(parse_statement(&at_limit).is_ok());
    }

    #[test]
    fn test_update_sets() {
        let statement =
            parse_statement("update users set level = level + 1, title = 'Pro', a.b = 3 where id = 5;")
                .unwrap();
        let Statement::Update(u) = statement else {
            panic!("expected update");
        };
        assert_eq!(u.collection.as_str(), "users");
        assert_eq!(u.assignments.len(), 3);
        assert_eq!(
            u.assignments[0].value,
            AssignmentValue::Equation(EquationRef::new("level + 1"))
        );
        assert_eq!(
            u.assignments[1].value,
            AssignmentValue::Literal(Literal::String("Pro".into()))
        );
        assert_eq!(u.assignments[2].field.to_store_path(), "a/b");
        assert_eq!(u.predicates.len(), 1);
    }

    #[test]
    fn test_update_field_reference() {
        let Statement::Update(u) = parse_statement("update t set copy = address.city").unwrap() else {
            panic!("expected update");
        };
        assert_eq!(
            u.assignments[0].value,
            AssignmentValue::Equation(EquationRef::new("address.city"))
        );
    }

    #[test]
    fn test_update_requires_set() {
        let err = parse_statement("update users where id = 1").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_SET");
    }

    #[test]
    fn test_insert_tuples() {
        let Statement::Insert(i) = parse_statement(
            "insert into users (name, level) values ('Joe', 1), ('Ann', 2);",
        )
        .unwrap() else {
            panic!("expected insert");
        };
        assert_eq!(i.collection.as_str(), "users");
        assert_eq!(i.tuple.columns, vec!["name", "level"]);
        assert_eq!(i.tuple.value_rows.len(), 2);
        assert_eq!(i.tuple.value_rows[1][1].to_value(), json!(2));
        assert_eq!(i.tuple.replication_count, 1);
    }

    #[test]
    fn test_insert_replication_count() {
        let Statement::Insert(i) = parse_statement("insert 3 into t (n) values ('a')").unwrap() else {
            panic!("expected insert");
        };
        assert_eq!(i.collection.as_str(), "t");
        assert_eq!(i.tuple.replication_count, 3);
    }

    #[test]
    fn test_insert_value_count_mismatch() {
        let err = parse_statement("insert into t (a, b) values (1)").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_INSERT");

        let err = parse_statement("insert into t values (1)").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_INSERT");
    }

    #[test]
    fn test_delete_forms() {
        let Statement::Delete(d) = parse_statement("delete from users where cheater = true;").unwrap()
        else {
            panic!("expected delete");
        };
        assert_eq!(d.collection.as_str(), "users");
        match &d.predicates[0].value {
            PredicateValue::Literal(l) => assert_eq!(l, &Literal::Bool(true)),
            _ => panic!("expected literal"),
        }

        let Statement::Delete(d) = parse_statement("delete sessions").unwrap() else {
            panic!("expected delete");
        };
        assert_eq!(d.collection.as_str(), "sessions");
        assert!(d.predicates.is_empty());
    }

    #[test]
    fn test_nested_subquery_must_select() {
        let err = parse_statement("select * from t where a = (delete from b)").unwrap_err();
        assert_eq!(err.code().code(), "QUERY_INVALID_SUBQUERY");
    }
}
