//! logos-based binding path tokenizer.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (e.g. `.5` as [`Token::Number`] beats `.` as Dot)
//! 2. For equal length matches, earlier-defined variants win
//!
//! Whitespace is not skipped: a binding path is a single lexical unit, so any
//! character no token can start with is a lexing error.

use logos::Logos;

/// Binding path token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Identifier: property names and the `true`/`false` keywords.
    #[regex(r"[\p{L}_][\p{L}\p{Nd}_]*")]
    Ident,

    /// Numeric literal: optional sign, digits, fraction, exponent.
    ///
    /// The lexer is permissive (`1e` lexes); the parser rejects numerals that
    /// do not convert to a finite `f64`.
    #[regex(r"-?[0-9]+(\.[0-9]*)?([eE]-?[0-9]*)?")]
    #[regex(r"-?\.[0-9]+([eE]-?[0-9]*)?")]
    Number,

    /// Double-quoted string literal, escapes still encoded.
    #[regex(r#""([^"\\]|\\.)*""#)]
    DoubleQuoted,

    /// Single-quoted string literal, escapes still encoded.
    #[regex(r"'([^'\\]|\\.)*'")]
    SingleQuoted,

    /// `.`
    #[token(".")]
    Dot,

    /// `[`
    #[token("[")]
    BracketOpen,

    /// `]`
    #[token("]")]
    BracketClose,

    /// `,`
    #[token(",")]
    Comma,
}

/// A token with its source slice and byte span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token,
    pub text: &'a str,
    /// Byte offset where this token starts in the source.
    pub start: usize,
}

/// Tokenize a binding path.
///
/// Returns the byte offset of the first character that does not start any
/// token as the error.
pub fn tokenize(input: &str) -> Result<Vec<Spanned<'_>>, usize> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                text: &input[span.clone()],
                start: span.start,
            }),
            Err(()) => return Err(span.start),
        }
    }
    Ok(tokens)
}
