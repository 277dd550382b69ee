//! Literal values parsed from raw query text.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::{Number, Value};

/// Datetime layouts recognized without an explicit offset (read as UTC).
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Date-only layouts.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// A literal value from a WHERE, SET or VALUES clause
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// A string recognized as a date. Keeps its text so that equality with
    /// stored strings is unaffected.
    Timestamp {
        text: String,
        at: DateTime<FixedOffset>,
    },
}

impl Literal {
    /// Parses raw clause text.
    ///
    /// Quoted text (`'..'` or `".."`) is a string unless it reads as a date.
    /// Unquoted `null`, `true`, `false` and numbers are typed; any other
    /// unquoted text is kept verbatim as a string.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().trim_end_matches(';').trim();

        if let Some(inner) = unquote(text) {
            return Self::from_quoted(inner);
        }

        match text.to_ascii_lowercase().as_str() {
            "null" | "undefined" => return Literal::Null,
            "true" => return Literal::Bool(true),
            "false" => return Literal::Bool(false),
            _ => {}
        }

        if let Some(number) = parse_number(text) {
            return Literal::Number(number);
        }

        Self::from_quoted(text)
    }

    /// Builds a literal from the contents of a quoted string: a timestamp
    /// when it reads as a date, a string otherwise.
    pub fn from_quoted(text: &str) -> Self {
        match parse_date(text) {
            Some(at) => Literal::Timestamp {
                text: text.to_string(),
                at,
            },
            None => Literal::String(text.to_string()),
        }
    }

    /// Returns true for the null literal
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// Converts to the JSON value written to or compared with the store
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(n.clone()),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Timestamp { text, .. } => Value::String(text.clone()),
        }
    }
}

/// Strips matching single or double quotes.
pub(crate) fn unquote(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'\'' || first == b'"') && first == last {
            return Some(&text[1..text.len() - 1]);
        }
    }
    None
}

/// Parses an integer or finite float.
pub(crate) fn parse_number(text: &str) -> Option<Number> {
    if text.is_empty() {
        return None;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Number::from(i));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Number::from_f64(f),
        _ => None,
    }
}

/// Reads a value as a number: JSON numbers, or strings holding a number.
pub fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s.trim()).and_then(|n| n.as_f64()),
        _ => None,
    }
}

/// Detects a date string.
///
/// RFC 3339 first, then offset-less datetimes and plain dates (UTC).
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    // Needs at least a separator to avoid treating bare numbers as dates
    if text.len() < 8 || !text.contains(['-', '/']) {
        return None;
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at);
    }
    let utc = FixedOffset::east_opt(0)?;
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(utc.from_utc_datetime(&naive));
        }
    }
    None
}

/// Reads a value as a date: strings in a recognized layout.
pub fn date_of(value: &Value) -> Option<DateTime<FixedOffset>> {
    value.as_str().and_then(parse_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(Literal::parse("null"), Literal::Null);
        assert_eq!(Literal::parse("TRUE"), Literal::Bool(true));
        assert_eq!(Literal::parse("false;"), Literal::Bool(false));
        assert_eq!(Literal::parse("42").to_value(), json!(42));
        assert_eq!(Literal::parse("-2.5").to_value(), json!(-2.5));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(Literal::parse("'x@y.com'"), Literal::String("x@y.com".into()));
        assert_eq!(Literal::parse("\"Joe\""), Literal::String("Joe".into()));
        // Quoted numbers stay strings
        assert_eq!(Literal::parse("'5'"), Literal::String("5".into()));
        assert_eq!(Literal::parse("bare"), Literal::String("bare".into()));
    }

    #[test]
    fn test_date_detection() {
        let lit = Literal::parse("'2017-01-15'");
        assert!(matches!(lit, Literal::Timestamp { .. }));
        // Dates compare as stored strings
        assert_eq!(lit.to_value(), json!("2017-01-15"));

        assert!(parse_date("2017-01-15T10:00:00Z").is_some());
        assert!(parse_date("2017-01-15 10:00:00").is_some());
        assert!(parse_date("20170115").is_none());
        assert!(parse_date("hello-world").is_none());
    }

    #[test]
    fn test_numeric_reads_strings() {
        assert_eq!(numeric(&json!("12")), Some(12.0));
        assert_eq!(numeric(&json!(1.5)), Some(1.5));
        assert_eq!(numeric(&json!("abc")), None);
        assert_eq!(numeric(&json!(true)), None);
        assert_eq!(numeric(&json!("")), None);
    }
}
