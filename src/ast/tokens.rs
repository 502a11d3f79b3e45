use rust_decimal::Decimal;
use serde::Serialize;

use crate::ast::Operator;

/// A half-open byte range into the expression source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// Classification of a lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Punctuation, comparison or logical operator
    ///
    /// # Examples
    /// ```text
    /// (  )  ,  +  <=  AND  not
    /// ```
    Operator(Operator),

    /// Field name, bare or enclosed in brackets
    ///
    /// The token itself does not carry the name: it is sliced from the
    /// source through the token span, so brackets and escapes are still
    /// present.
    ///
    /// # Examples
    /// ```text
    /// Total
    /// [Created At]
    /// [Product → Category]
    /// ```
    Identifier,

    /// String literal in single or double quotes, escapes already decoded
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// ```
    String(String),

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// .5
    /// 1e3
    /// ```
    Number(Decimal),

    /// Numeric literal too large or too precise for [`Decimal`]
    ///
    /// # Examples
    /// ```text
    /// 1e30
    /// 1.5e-40
    /// ```
    Float(f64),

    /// `true` or `false`, case-insensitive
    Boolean(bool),
}

/// A token together with the byte range it was scanned from.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }

    /// Raw source text of the token.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or_default()
    }

    pub fn is_op(&self, op: Operator) -> bool {
        matches!(self.kind, TokenKind::Operator(o) if o == op)
    }

    pub fn operator(&self) -> Option<Operator> {
        match self.kind {
            TokenKind::Operator(op) => Some(op),
            _ => None,
        }
    }
}
