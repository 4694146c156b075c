//! Backtracking recursive descent binding path parser.
//!
//! Parses a token stream from [`crate::path::tokenizer`] into a
//! [`BindingPath`]. Every production either succeeds or restores the cursor to
//! where it started, so alternatives can be tried in order. Choice is ordered:
//! once an alternative matches it is never revisited, even if the caller fails
//! afterwards.

use std::str::{Chars, FromStr};

use crate::path::model::{BindingPath, Index, PathNode};
use crate::path::tokenizer::{tokenize, Spanned, Token};

/// Errors from binding path parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyntaxError {
    #[error("invalid character {found:?} at byte {position}")]
    InvalidCharacter { position: usize, found: char },
    #[error("unexpected '{found}' at byte {position}")]
    UnexpectedToken { position: usize, found: String },
    #[error("unexpected end of path expression")]
    UnexpectedEof,
}

/// Parse a binding path expression.
pub fn parse_path(input: &str) -> Result<BindingPath, SyntaxError> {
    let tokens = tokenize(input).map_err(|position| SyntaxError::InvalidCharacter {
        position,
        found: input[position..].chars().next().unwrap_or_default(),
    })?;

    let mut parser = Parser {
        tokens,
        cursor: 0,
        furthest: 0,
    };

    match parser.nodes() {
        Some(nodes) if parser.is_eof() => Ok(BindingPath { nodes }),
        _ => Err(parser.error()),
    }
}

impl BindingPath {
    /// Parse a binding path expression. See [`parse_path`].
    pub fn parse(input: &str) -> Result<Self, SyntaxError> {
        parse_path(input)
    }
}

impl FromStr for BindingPath {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

/// Backtracking parser state.
struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    cursor: usize,
    /// Furthest token index at which a production failed (for error reporting).
    furthest: usize,
}

impl<'a> Parser<'a> {
    fn is_eof(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Consume the next token if it is `expected`.
    fn eat(&mut self, expected: Token) -> Option<Spanned<'a>> {
        match self.tokens.get(self.cursor) {
            Some(tok) if tok.token == expected => {
                let tok = *tok;
                self.cursor += 1;
                Some(tok)
            }
            _ => {
                self.fail_here();
                None
            }
        }
    }

    fn fail_here(&mut self) {
        self.furthest = self.furthest.max(self.cursor);
    }

    /// Run a production, restoring the cursor if it fails.
    fn attempt<T>(&mut self, production: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let saved = self.cursor;
        let result = production(self);
        if result.is_none() {
            self.cursor = saved;
        }
        result
    }

    fn error(&self) -> SyntaxError {
        let at = self.furthest.max(self.cursor);
        match self.tokens.get(at) {
            Some(tok) => SyntaxError::UnexpectedToken {
                position: tok.start,
                found: tok.text.to_string(),
            },
            None => SyntaxError::UnexpectedEof,
        }
    }

    // -- productions ---------------------------------------------------------

    /// `path := node ("." node)*`
    fn nodes(&mut self) -> Option<Vec<PathNode>> {
        self.attempt(|p| {
            let mut nodes = vec![p.node(true)?];
            while p.eat(Token::Dot).is_some() {
                // A dot commits to another node; `A.` and `A..B` fail the whole path.
                nodes.push(p.node(false)?);
            }
            Some(nodes)
        })
    }

    /// `node := identifier? indices?`, at least one present; only the first
    /// node of a path may omit the identifier.
    fn node(&mut self, first: bool) -> Option<PathNode> {
        self.attempt(|p| {
            let property = p.identifier();
            let indices = p.indices().unwrap_or_default();
            if property.is_none() && (!first || indices.is_empty()) {
                return None;
            }
            Some(PathNode { property, indices })
        })
    }

    /// `indices := "[" index ("," index)* "]"`
    fn indices(&mut self) -> Option<Vec<Index>> {
        self.attempt(|p| {
            p.eat(Token::BracketOpen)?;
            let mut list = vec![p.index()?];
            while p.eat(Token::Comma).is_some() {
                list.push(p.index()?);
            }
            p.eat(Token::BracketClose)?;
            Some(list)
        })
    }

    /// `index := boolean | path | stringLit | number`, in that priority.
    fn index(&mut self) -> Option<Index> {
        if let Some(b) = self.boolean() {
            return Some(Index::Boolean(b));
        }
        if let Some(nodes) = self.nodes() {
            return Some(Index::Path(nodes));
        }
        if let Some(s) = self.string_literal() {
            return Some(Index::String(s));
        }
        self.number().map(Index::Number)
    }

    fn identifier(&mut self) -> Option<String> {
        self.eat(Token::Ident).map(|tok| tok.text.to_string())
    }

    fn boolean(&mut self) -> Option<bool> {
        self.attempt(|p| match p.eat(Token::Ident)?.text {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
    }

    fn string_literal(&mut self) -> Option<String> {
        self.attempt(|p| {
            let tok = p
                .eat(Token::DoubleQuoted)
                .or_else(|| p.eat(Token::SingleQuoted))?;
            let body = &tok.text[1..tok.text.len() - 1];
            let decoded = unescape(body);
            if decoded.is_none() {
                p.cursor -= 1;
                p.fail_here();
            }
            decoded
        })
    }

    fn number(&mut self) -> Option<f64> {
        self.attempt(|p| {
            let tok = p.eat(Token::Number)?;
            match tok.text.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                _ => {
                    p.cursor -= 1;
                    p.fail_here();
                    None
                }
            }
        })
    }
}

/// Decode the escapes of a string literal body.
///
/// Supported: `\\ \' \" \n \r \t \xHH \uHHHH`. Anything else, or a code point
/// that is not a Unicode scalar value, fails.
fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next()? {
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'x' => hex_char(&mut chars, 2)?,
            'u' => hex_char(&mut chars, 4)?,
            _ => return None,
        };
        out.push(decoded);
    }
    Some(out)
}

fn hex_char(chars: &mut Chars<'_>, digits: usize) -> Option<char> {
    let mut code = 0u32;
    for _ in 0..digits {
        code = code * 16 + chars.next()?.to_digit(16)?;
    }
    char::from_u32(code)
}
