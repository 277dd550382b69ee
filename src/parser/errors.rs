//! Parser error types
//!
//! Error codes:
//! - QUERY_INVALID_TOKEN
//! - QUERY_INVALID_COLLECTION
//! - QUERY_INVALID_COMPARATOR
//! - QUERY_INVALID_SET
//! - QUERY_INVALID_INSERT
//! - QUERY_INVALID_SUBQUERY
//!
//! Parse errors abort execution before any fetch and are never retried.

use std::fmt;

/// Parser-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// Unterminated string or stray character
    InvalidToken,
    /// Collection path could not be determined
    InvalidCollection,
    /// WHERE term without a recognized comparator, field or value
    InvalidComparator,
    /// SET clause missing or malformed
    InvalidSet,
    /// INSERT columns/values missing or mismatched
    InvalidInsert,
    /// Parenthesized WHERE value that is not a valid nested select
    InvalidSubquery,
}

impl ParseErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorCode::InvalidToken => "QUERY_INVALID_TOKEN",
            ParseErrorCode::InvalidCollection => "QUERY_INVALID_COLLECTION",
            ParseErrorCode::InvalidComparator => "QUERY_INVALID_COMPARATOR",
            ParseErrorCode::InvalidSet => "QUERY_INVALID_SET",
            ParseErrorCode::InvalidInsert => "QUERY_INVALID_INSERT",
            ParseErrorCode::InvalidSubquery => "QUERY_INVALID_SUBQUERY",
        }
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Parse error with full context
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    code: ParseErrorCode,
    message: String,
    /// Byte offset into the query text, if known
    position: Option<usize>,
}

impl ParseError {
    /// Create an invalid token error
    pub fn invalid_token(position: usize, reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidToken,
            message: reason.into(),
            position: Some(position),
        }
    }

    /// Create a collection resolution error
    pub fn invalid_collection(reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidCollection,
            message: reason.into(),
            position: None,
        }
    }

    /// Create an unrecognized comparator error for a WHERE term
    pub fn unrecognized_comparator(term: &str) -> Self {
        Self {
            code: ParseErrorCode::InvalidComparator,
            message: format!("Unrecognized comparator in where clause: '{}'.", term.trim()),
            position: None,
        }
    }

    /// Create a malformed WHERE term error
    pub fn invalid_where(reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidComparator,
            message: reason.into(),
            position: None,
        }
    }

    /// Create a malformed SET clause error
    pub fn invalid_set(reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidSet,
            message: reason.into(),
            position: None,
        }
    }

    /// Create a malformed INSERT error
    pub fn invalid_insert(reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidInsert,
            message: reason.into(),
            position: None,
        }
    }

    /// Create a malformed subquery error
    pub fn invalid_subquery(reason: impl Into<String>) -> Self {
        Self {
            code: ParseErrorCode::InvalidSubquery,
            message: reason.into(),
            position: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ParseErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the byte offset, if known
    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PARSE] {}: {}", self.code.code(), self.message)?;
        if let Some(position) = self.position {
            write!(f, " (at {})", position)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ParseErrorCode::InvalidComparator.code(),
            "QUERY_INVALID_COMPARATOR"
        );
        assert_eq!(ParseErrorCode::InvalidInsert.code(), "QUERY_INVALID_INSERT");
    }

    #[test]
    fn test_error_display() {
        let err = ParseError::unrecognized_comparator(" age ~ 3 ");
        let display = format!("{}", err);
        assert!(display.contains("QUERY_INVALID_COMPARATOR"));
        assert!(display.contains("'age ~ 3'"));

        let err = ParseError::invalid_token(7, "Unterminated string");
        assert!(format!("{}", err).ends_with("(at 7)"));
    }
}
