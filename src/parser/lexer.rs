//! Tokenizer for the query language.
//!
//! Words are runs of anything that is not whitespace, punctuation, a
//! comparison symbol or a quote. Dotted paths, `*`, `x@y.com`, `jo%`, dates
//! and signed numbers are therefore single words, and arithmetic operators
//! only stand alone when written with surrounding spaces.

use super::errors::{ParseError, ParseResult};

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: keyword, identifier, number, path
    Word(String),
    /// Quoted string, quotes removed
    Str(String),
    /// `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`
    Symbol(&'static str),
    Comma,
    Semicolon,
    LParen,
    RParen,
}

/// A token with its byte span in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// Returns the word text, if this is a word
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Case-insensitive keyword match
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.word().is_some_and(|w| w.eq_ignore_ascii_case(keyword))
    }

    /// Returns true for the given comparison symbol
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(&self.kind, TokenKind::Symbol(s) if *s == symbol)
    }
}

/// Lexer over a query string
pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            position: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.position + 1).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map(|(i, _)| *i)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        self.position += 1;
        ch
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> ParseResult<Option<Token>> {
        self.skip_whitespace();
        let start = self.offset();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let kind = match ch {
            ',' => {
                self.advance();
                TokenKind::Comma
            }
            ';' => {
                self.advance();
                TokenKind::Semicolon
            }
            '(' => {
                self.advance();
                TokenKind::LParen
            }
            ')' => {
                self.advance();
                TokenKind::RParen
            }
            '\'' | '"' => TokenKind::Str(self.read_string(ch, start)?),
            '=' => {
                self.advance();
                TokenKind::Symbol("=")
            }
            '!' if self.peek_next() == Some('=') => {
                self.advance();
                self.advance();
                TokenKind::Symbol("!=")
            }
            '<' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        TokenKind::Symbol("<=")
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::Symbol("<>")
                    }
                    _ => TokenKind::Symbol("<"),
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::Symbol(">=")
                } else {
                    TokenKind::Symbol(">")
                }
            }
            _ => TokenKind::Word(self.read_word()),
        };

        Ok(Some(Token {
            kind,
            start,
            end: self.offset(),
        }))
    }

    fn read_string(&mut self, quote: char, start: usize) -> ParseResult<String> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                Some(c) if c == quote => return Ok(value),
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(ParseError::invalid_token(start, "Unterminated string literal"))
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            let ends_word = c.is_whitespace()
                || matches!(c, ',' | ';' | '(' | ')' | '\'' | '"' | '=' | '<' | '>')
                || (c == '!' && self.peek_next() == Some('='));
            if ends_word {
                break;
            }
            word.push(c);
            self.advance();
        }
        word
    }
}

/// Removes `--` and `//` line comments and folds newlines into spaces.
///
/// A comment only starts at a token boundary outside of quoted strings, so
/// `'http://host'` survives intact.
pub fn clean_query(query: &str) -> String {
    let mut cleaned = String::with_capacity(query.len());
    for line in query.lines() {
        if !cleaned.is_empty() {
            cleaned.push(' ');
        }
        cleaned.push_str(strip_line_comment(line));
    }
    cleaned.trim().to_string()
}

fn strip_line_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut at_boundary = true;
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                let next = chars.peek().map(|(_, n)| *n);
                if at_boundary && ((c == '-' && next == Some('-')) || (c == '/' && next == Some('/'))) {
                    return line[..i].trim_end();
                }
                if c == '\'' || c == '"' {
                    quote = Some(c);
                }
            }
        }
        at_boundary = c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_tokenize_select() {
        let tokens = kinds("select * from users where email = 'x@y.com';");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Word("select".into()),
                TokenKind::Word("*".into()),
                TokenKind::Word("from".into()),
                TokenKind::Word("users".into()),
                TokenKind::Word("where".into()),
                TokenKind::Word("email".into()),
                TokenKind::Symbol("="),
                TokenKind::Str("x@y.com".into()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comparison_symbols() {
        let tokens = kinds("a!=1 b<>2 c<=3 d>=4 e<5 f>6");
        let symbols: Vec<_> = tokens
            .into_iter()
            .filter_map(|k| match k {
                TokenKind::Symbol(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(symbols, vec!["!=", "<>", "<=", ">=", "<", ">"]);
    }

    #[test]
    fn test_not_like_word() {
        let tokens = kinds("name !like 'jo%'");
        assert_eq!(tokens[1], TokenKind::Word("!like".into()));
    }

    #[test]
    fn test_arithmetic_needs_spaces() {
        assert_eq!(kinds("level+1"), vec![TokenKind::Word("level+1".into())]);
        assert_eq!(kinds("level + 1").len(), 3);
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "update a.b set x = 1";
        let tokens = Lexer::new(source).tokenize().unwrap();
        assert_eq!(&source[tokens[1].start..tokens[1].end], "a.b");
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("select * from t where a = 'open").tokenize();
        assert!(err.is_err());
    }

    #[test]
    fn test_clean_query() {
        let query = "select * from users -- all users\nwhere url = 'http://x' // note";
        assert_eq!(
            clean_query(query),
            "select * from users where url = 'http://x'"
        );
        assert_eq!(clean_query("select * from a--b"), "select * from a--b");
    }
}
