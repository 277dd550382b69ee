//! SET equation evaluation.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/') unary)*
//! unary  := '-' unary | atom
//! atom   := number | 'text' | "text" | field | '(' expr ')'
//! ```
//!
//! Fields are dotted references into the record being updated. `+` adds
//! numbers and concatenates as soon as either side is text; the other
//! operators coerce numeric text and reject anything else.

use serde_json::Value;

use super::errors::{PlanError, PlanResult};
use crate::parser::numeric;
use crate::value::{number_value, FieldPath};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Field(String),
    Operator(char),
    LParen,
    RParen,
}

/// Intermediate result of a sub-expression
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn into_value(self, equation: &str) -> PlanResult<Value> {
        match self {
            Scalar::Number(n) => {
                number_value(n).ok_or_else(|| PlanError::NonFinite(equation.to_string()))
            }
            Scalar::Text(s) => Ok(Value::String(s)),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => numeric(&Value::String(s.clone())),
        }
    }

    fn render(&self) -> String {
        match self {
            Scalar::Number(n) => match number_value(*n) {
                Some(v) => v.to_string(),
                None => n.to_string(),
            },
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// Evaluates `equation` against `record`.
pub fn evaluate(equation: &str, record: &Value) -> PlanResult<Value> {
    let tokens = tokenize(equation)?;
    let mut evaluator = Evaluator {
        equation,
        tokens,
        pos: 0,
        record,
    };
    let result = evaluator.expr()?;
    if evaluator.pos < evaluator.tokens.len() {
        return Err(PlanError::invalid(equation, "unexpected trailing input"));
    }
    result.into_value(equation)
}

fn tokenize(equation: &str) -> PlanResult<Vec<Token>> {
    let chars: Vec<char> = equation.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Operator(c));
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            '\'' | '"' => {
                let start = pos + 1;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == c)
                    .map(|offset| start + offset)
                    .ok_or_else(|| PlanError::invalid(equation, "unterminated string"))?;
                tokens.push(Token::Text(chars[start..end].iter().collect()));
                pos = end + 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = pos;
                while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| PlanError::invalid(equation, format!("bad number '{}'", text)))?;
                tokens.push(Token::Number(n));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let start = pos;
                while pos < chars.len()
                    && (chars[pos].is_alphanumeric() || matches!(chars[pos], '_' | '$' | '.'))
                {
                    pos += 1;
                }
                tokens.push(Token::Field(chars[start..pos].iter().collect()));
            }
            other => {
                return Err(PlanError::invalid(
                    equation,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

struct Evaluator<'a> {
    equation: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    record: &'a Value,
}

impl<'a> Evaluator<'a> {
    fn peek_operator(&self) -> Option<char> {
        match self.tokens.get(self.pos) {
            Some(Token::Operator(op)) => Some(*op),
            _ => None,
        }
    }

    fn expr(&mut self) -> PlanResult<Scalar> {
        let mut left = self.term()?;
        while let Some(op @ ('+' | '-')) = self.peek_operator() {
            self.pos += 1;
            let right = self.term()?;
            left = self.apply(op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> PlanResult<Scalar> {
        let mut left = self.unary()?;
        while let Some(op @ ('*' | '/')) = self.peek_operator() {
            self.pos += 1;
            let right = self.unary()?;
            left = self.apply(op, left, right)?;
        }
        Ok(left)
    }

    fn unary(&mut self) -> PlanResult<Scalar> {
        if self.peek_operator() == Some('-') {
            self.pos += 1;
            let operand = self.unary()?;
            let n = operand.as_number().ok_or_else(|| self.non_numeric('-'))?;
            return Ok(Scalar::Number(-n));
        }
        self.atom()
    }

    fn atom(&mut self) -> PlanResult<Scalar> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| PlanError::invalid(self.equation, "unexpected end of equation"))?;
        self.pos += 1;

        match token {
            Token::Number(n) => Ok(Scalar::Number(n)),
            Token::Text(s) => Ok(Scalar::Text(s)),
            Token::Field(name) => self.field(&name),
            Token::LParen => {
                let inner = self.expr()?;
                match self.tokens.get(self.pos) {
                    Some(Token::RParen) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    _ => Err(PlanError::invalid(self.equation, "missing ')'")),
                }
            }
            Token::RParen => Err(PlanError::invalid(self.equation, "unexpected ')'")),
            Token::Operator(op) => Err(PlanError::invalid(
                self.equation,
                format!("unexpected operator '{}'", op),
            )),
        }
    }

    fn field(&self, name: &str) -> PlanResult<Scalar> {
        let value = FieldPath::parse(name)
            .resolve(self.record)
            .ok_or_else(|| PlanError::MissingField {
                field: name.to_string(),
                equation: self.equation.to_string(),
            })?;

        match value {
            Value::Number(n) => n
                .as_f64()
                .map(Scalar::Number)
                .ok_or_else(|| PlanError::NonFinite(self.equation.to_string())),
            Value::String(s) => Ok(Scalar::Text(s.clone())),
            Value::Bool(b) => Ok(Scalar::Text(b.to_string())),
            Value::Null => Ok(Scalar::Text("null".to_string())),
            Value::Array(_) | Value::Object(_) => Err(PlanError::invalid(
                self.equation,
                format!("field '{}' is not a scalar", name),
            )),
        }
    }

    fn apply(&self, op: char, left: Scalar, right: Scalar) -> PlanResult<Scalar> {
        if op == '+' {
            return Ok(match (&left, &right) {
                (Scalar::Number(a), Scalar::Number(b)) => Scalar::Number(a + b),
                _ => Scalar::Text(format!("{}{}", left.render(), right.render())),
            });
        }

        let a = left.as_number().ok_or_else(|| self.non_numeric(op))?;
        let b = right.as_number().ok_or_else(|| self.non_numeric(op))?;
        Ok(Scalar::Number(match op {
            '-' => a - b,
            '*' => a * b,
            _ => a / b,
        }))
    }

    fn non_numeric(&self, operator: char) -> PlanError {
        PlanError::NonNumericOperand {
            equation: self.equation.to_string(),
            operator,
        }
    }
}
