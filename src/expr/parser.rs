//! Expression parsing.
//!
//! Converts textual call expressions (`eq(board[target], null)`) into
//! expression trees. The grammar is small: literals, calls, property
//! chains, and bracket indices, with suffixes combining left-to-right.
//! There is no recovery - a malformed expression fails the whole
//! specification load.

use smallvec::SmallVec;
use thiserror::Error;

use crate::core::Value;

use super::ast::{Args, Builtin, Expr};

/// Failure to parse an expression. Fatal at specification-load time.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParseError {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected character '{found}' at byte {at}")]
    UnexpectedChar { found: char, at: usize },

    #[error("expected '{expected}' at byte {at}")]
    Expected { expected: char, at: usize },

    #[error("missing identifier at byte {at}")]
    MissingIdentifier { at: usize },

    #[error("trailing input at byte {at}")]
    TrailingInput { at: usize },

    #[error("unterminated string starting at byte {at}")]
    UnterminatedString { at: usize },

    #[error("malformed number '{text}'")]
    BadNumber { text: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("{function} takes {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{found} is not an assignable location")]
    NotAssignable { found: &'static str },

    #[error("unknown effect '{name}'")]
    UnknownEffect { name: String },
}

/// Parse one complete expression, consuming all input.
pub fn parse(src: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(src);
    let expr = parser.parse_expr()?;
    parser.expect_end()?;
    Ok(expr)
}

/// Cursor over expression text.
///
/// Effect compilation reuses this from `rules::action` to parse the effect
/// heads (`set`, `if`, `remove_entity`) around ordinary sub-expressions.
pub(crate) struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    pub(crate) fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    pub(crate) fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) | None => Err(ParseError::Expected {
                expected,
                at: self.pos,
            }),
        }
    }

    fn eat_if(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Fail unless all input has been consumed.
    pub(crate) fn expect_end(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos < self.chars.len() {
            Err(ParseError::TrailingInput { at: self.pos })
        } else {
            Ok(())
        }
    }

    pub(crate) fn parse_ident(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::MissingIdentifier { at: start });
        }
        let ident: String = self.chars[start..self.pos].iter().collect();
        if ident.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ParseError::UnexpectedChar {
                found: self.chars[start],
                at: start,
            });
        }
        Ok(ident)
    }

    /// Parse one expression: a primary followed by `.field` / `[key]`
    /// suffixes.
    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some('.') => {
                    self.pos += 1;
                    let at = self.pos;
                    let field = self
                        .parse_ident()
                        .map_err(|_| ParseError::MissingIdentifier { at })?;
                    expr = Expr::Property {
                        base: Box::new(expr),
                        field,
                    };
                }
                Some('[') => {
                    self.pos += 1;
                    let key = self.parse_expr()?;
                    self.expect(']')?;
                    expr = Expr::Index {
                        base: Box::new(expr),
                        key: Box::new(key),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_ws();
        match self.peek() {
            None => Err(ParseError::UnexpectedEnd),
            Some(q @ ('\'' | '"')) => self.parse_string(q),
            Some(c) if c.is_ascii_digit() || c == '-' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.parse_ident()?;
                match name.as_str() {
                    "null" => Ok(Expr::Literal(Value::Null)),
                    "true" => Ok(Expr::Literal(Value::Bool(true))),
                    "false" => Ok(Expr::Literal(Value::Bool(false))),
                    _ if self.peek() == Some('(') => {
                        self.pos += 1;
                        let args = self.parse_args()?;
                        let builtin = Builtin::resolve(&name)
                            .ok_or(ParseError::UnknownFunction { name })?;
                        if !builtin.arity_ok(args.len()) {
                            return Err(ParseError::Arity {
                                function: builtin.name(),
                                expected: builtin.arity_description(),
                                found: args.len(),
                            });
                        }
                        Ok(Expr::Call {
                            builtin,
                            args: Box::new(args),
                        })
                    }
                    _ => Ok(Expr::Ident(name)),
                }
            }
            Some(found) => Err(ParseError::UnexpectedChar {
                found,
                at: self.pos,
            }),
        }
    }

    /// Parse a comma-separated argument list; the opening `(` is consumed.
    fn parse_args(&mut self) -> Result<Args, ParseError> {
        let mut args: Args = SmallVec::new();
        self.skip_ws();
        if self.eat_if(')') {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            self.skip_ws();
            if self.eat_if(',') {
                continue;
            }
            self.expect(')')?;
            return Ok(args);
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Expr::Literal(Value::Str(text))),
                Some(c) => text.push(c),
                None => return Err(ParseError::UnterminatedString { at: start }),
            }
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(ParseError::UnexpectedChar {
                found: '-',
                at: start,
            });
        }

        let mut is_float = false;
        if self.peek() == Some('.') {
            // Only a digit after the dot makes this a real literal; otherwise
            // the dot is left for the suffix loop and becomes a property
            // access on an integer, which fails at evaluation.
            if matches!(self.chars.get(self.pos + 1), Some(c) if c.is_ascii_digit()) {
                is_float = true;
                self.pos += 1;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            text.parse::<f64>()
                .map(|f| Expr::Literal(Value::Float(f)))
                .map_err(|_| ParseError::BadNumber { text })
        } else {
            text.parse::<i64>()
                .map(|i| Expr::Literal(Value::Int(i)))
                .map_err(|_| ParseError::BadNumber { text })
        }
    }
}
