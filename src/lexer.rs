use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ast::{Operator, Span, Token, TokenKind};

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?").expect("number pattern")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}_][\p{L}\p{N}_.]*").expect("word pattern"));

/// A malformed token. Scanning stops at the first one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

impl LexError {
    fn new(message: impl Into<String>, start: usize, end: usize) -> Self {
        LexError {
            message: message.into(),
            span: Span::new(start, end),
        }
    }
}

/// Output of [`tokenize`]: the tokens scanned so far and at most one error.
#[derive(Debug, Clone, Default)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Scan a whole expression.
///
/// Lexical errors are returned rather than raised so that diagnostics can
/// report them like any other problem.
pub fn tokenize(source: &str) -> Tokenized {
    let mut lexer = Lexer::new(source);
    let mut result = Tokenized::default();
    loop {
        match lexer.next_token() {
            Ok(Some(token)) => result.tokens.push(token),
            Ok(None) => break,
            Err(e) => {
                result.errors.push(e);
                break;
            }
        }
    }
    result
}

pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            position: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(TokenKind::String(result));
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('b') => result.push('\u{8}'),
                        Some('f') => result.push('\u{c}'),
                        Some('v') => result.push('\u{b}'),
                        Some('0') => result.push('\0'),
                        Some('u') => match self.read_unicode_escape() {
                            Some(decoded) => {
                                result.push(decoded);
                                continue;
                            }
                            None => result.push('u'),
                        },
                        // \\, \', \" and anything else stand for themselves
                        Some(other) => result.push(other),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Missing closing quotes", start, self.position))
    }

    /// Decode `uXXXX` with the cursor on the `u`. Leaves the cursor past the
    /// escape on success and untouched otherwise.
    fn read_unicode_escape(&mut self) -> Option<char> {
        let hex = self.rest().get(1..5)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)?;
        self.position += 5;
        Some(decoded)
    }

    fn read_bracket_identifier(&mut self) -> Result<TokenKind, LexError> {
        let start = self.position;
        self.advance(); // '['

        while let Some(ch) = self.current_char() {
            match ch {
                ']' => {
                    self.advance();
                    return Ok(TokenKind::Identifier);
                }
                '[' => {
                    return Err(LexError::new(
                        "Bracket identifier in another bracket identifier",
                        start,
                        self.position + 1,
                    ));
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                _ => self.advance(),
            }
        }

        Err(LexError::new("Missing a closing bracket", start, self.position))
    }

    fn read_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.position;
        let text = NUMBER.find(self.rest()).map(|m| m.as_str()).unwrap_or_default();
        self.position += text.len();

        let normalized = if text.starts_with('.') {
            format!("0{}", text)
        } else {
            text.to_string()
        };
        let parsed = if normalized.contains(['e', 'E']) {
            Decimal::from_scientific(&normalized)
        } else {
            Decimal::from_str(&normalized)
        };

        if let Ok(n) = parsed {
            return Ok(TokenKind::Number(n));
        }
        // beyond 28 digits of scale or magnitude
        match f64::from_str(&normalized) {
            Ok(f) if f.is_finite() => Ok(TokenKind::Float(f)),
            _ => Err(LexError::new(
                format!("Invalid number: {}", text),
                start,
                self.position,
            )),
        }
    }

    fn read_word(&mut self) -> Result<TokenKind, LexError> {
        let start = self.position;
        let text = WORD.find(self.rest()).map(|m| m.as_str()).unwrap_or_default();
        if text.is_empty() {
            let ch = self.current_char().unwrap_or_default();
            return Err(LexError::new(
                format!("Invalid character: {}", ch),
                start,
                start + ch.len_utf8(),
            ));
        }
        self.position += text.len();

        Ok(match text.to_lowercase().as_str() {
            "and" => TokenKind::Operator(Operator::And),
            "or" => TokenKind::Operator(Operator::Or),
            "not" => TokenKind::Operator(Operator::Not),
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            _ => TokenKind::Identifier,
        })
    }

    fn operator(&mut self, op: Operator, width: usize) -> TokenKind {
        for _ in 0..width {
            self.advance();
        }
        TokenKind::Operator(op)
    }

    /// Scan the next token, `Ok(None)` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();
        let start = self.position;

        let kind = match self.current_char() {
            None => return Ok(None),
            Some(',') => self.operator(Operator::Comma, 1),
            Some('(') => self.operator(Operator::OpenParenthesis, 1),
            Some(')') => self.operator(Operator::CloseParenthesis, 1),
            Some('+') => self.operator(Operator::Plus, 1),
            Some('-') => self.operator(Operator::Minus, 1),
            Some('*') => self.operator(Operator::Star, 1),
            Some('/') => self.operator(Operator::Slash, 1),
            Some('=') => self.operator(Operator::Equal, 1),
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.operator(Operator::NotEqual, 2)
                } else {
                    return Err(LexError::new("Invalid character: !", start, start + 1));
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.operator(Operator::LessThanEqual, 2)
                } else {
                    self.operator(Operator::LessThan, 1)
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.operator(Operator::GreaterThanEqual, 2)
                } else {
                    self.operator(Operator::GreaterThan, 1)
                }
            }
            Some('"') => self.read_string('"')?,
            Some('\'') => self.read_string('\'')?,
            Some('[') => self.read_bracket_identifier()?,
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()?
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_word()?,
            Some(ch) => {
                return Err(LexError::new(
                    format!("Invalid character: {}", ch),
                    start,
                    start + ch.len_utf8(),
                ));
            }
        };

        Ok(Some(Token {
            kind,
            start,
            end: self.position,
        }))
    }
}

#[test]
fn test_keywords() {
    let tokens = tokenize("and OR Not TRUE false").tokens;
    let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Operator(Operator::And),
            TokenKind::Operator(Operator::Or),
            TokenKind::Operator(Operator::Not),
            TokenKind::Boolean(true),
            TokenKind::Boolean(false),
        ]
    );
}

#[test]
fn test_spans_cover_source() {
    let source = "[Total] <= 1.5";
    let tokens = tokenize(source).tokens;
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].text(source), "[Total]");
    assert_eq!(tokens[1].text(source), "<=");
    assert_eq!(tokens[2].text(source), "1.5");
}
