use thiserror::Error;

use crate::{
    ast::{Expr, Node, Operator, RefKind, Span, Token, TokenKind},
    catalog,
};

const COMPARISON_OPS: &[Operator] = &[
    Operator::Equal,
    Operator::NotEqual,
    Operator::LessThan,
    Operator::GreaterThan,
    Operator::LessThanEqual,
    Operator::GreaterThanEqual,
];

/// Nesting bound for groups, calls, unary chains and mixed operator chains.
pub const MAX_DEPTH: usize = 64;

/// Grammar violation, positioned at the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span: Some(span),
        }
    }
}

/// Parse a token stream produced from `source`.
pub fn parse(source: &str, tokens: Vec<Token>) -> Result<Expr, ParseError> {
    Parser::new(source, tokens).parse()
}

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Parser {
            source,
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// True if the next token is one of `ops`.
    fn check(&self, ops: &[Operator]) -> bool {
        self.peek()
            .and_then(Token::operator)
            .is_some_and(|op| ops.contains(&op))
    }

    /// Consume the next token if it is one of `ops`.
    fn match_op(&mut self, ops: &[Operator]) -> Option<(Operator, Span)> {
        if !self.check(ops) {
            return None;
        }
        let token = self.next()?;
        Some((token.operator()?, token.span()))
    }

    fn end_of_input(&self) -> Span {
        Span::new(self.source.len(), self.source.len())
    }

    fn expect(&mut self, expected: Operator) -> Result<Span, ParseError> {
        let Some(token) = self.next() else {
            return Err(ParseError::new(
                format!("Unexpected end of input, expecting {}", expected.describe()),
                self.end_of_input(),
            ));
        };
        if !token.is_op(expected) {
            return Err(ParseError::new(
                format!(
                    "Expecting {} but got {} instead",
                    expected.describe(),
                    token.text(self.source)
                ),
                token.span(),
            ));
        }
        Ok(token.span())
    }

    fn enter(&mut self, span: Span) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::new("Expression is too deeply nested", span));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        span: Span,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.enter(span)?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Group ::= "(" Expression ")"
    fn parse_group(&mut self) -> Result<Expr, ParseError> {
        let open = self.expect(Operator::OpenParenthesis)?;
        let expr = self.nested(open, Self::parse_expression)?;
        if !self.check(&[Operator::CloseParenthesis]) {
            let span = self.peek().map(Token::span).unwrap_or(open);
            return Err(ParseError::new("Expecting a closing parenthesis", span));
        }
        self.expect(Operator::CloseParenthesis)?;
        Ok(expr)
    }

    /// Parameters ::= "(" ")" | "(" Expression ("," Expression)* ")"
    fn parse_parameters(&mut self) -> Result<(Vec<Expr>, Span), ParseError> {
        let open = self.expect(Operator::OpenParenthesis)?;

        if self.check(&[Operator::CloseParenthesis]) {
            let close = self.expect(Operator::CloseParenthesis)?;
            return Ok((vec![], close));
        }

        let params = self.nested(open, |parser| {
            let mut params = vec![];
            loop {
                params.push(parser.parse_expression()?);
                if parser.match_op(&[Operator::Comma]).is_none() {
                    return Ok(params);
                }
            }
        })?;

        let close = self.expect(Operator::CloseParenthesis)?;
        Ok((params, close))
    }

    /// Primary ::= Literal | Identifier | FunctionName Parameters | Group
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&[Operator::OpenParenthesis]) {
            return self.parse_group();
        }

        let Some(token) = self.next() else {
            return Err(ParseError::new("Unexpected end of input", self.end_of_input()));
        };
        let span = token.span();
        let text = token.text(self.source);

        match token.kind {
            TokenKind::Operator(_) => Err(ParseError::new(
                format!("Unexpected operator {}", text),
                span,
            )),
            // [X] is always a field, even when X names a function
            TokenKind::Identifier if text.starts_with('[') => {
                let name = unescape_identifier(shrink(text));
                Ok(Expr::new(Node::Reference(RefKind::Dimension, name), span))
            }
            TokenKind::Identifier => {
                if self.check(&[Operator::OpenParenthesis]) {
                    // unknown functions keep their text and fail at resolution
                    let name = catalog::mbql_name(text)
                        .map(str::to_string)
                        .unwrap_or_else(|| text.to_string());
                    let (params, close) = self.parse_parameters()?;
                    Ok(Expr::new(Node::Clause(name, params), span.to(close)))
                } else {
                    Ok(Expr::new(
                        Node::Reference(RefKind::Dimension, text.to_string()),
                        span,
                    ))
                }
            }
            TokenKind::String(s) => Ok(Expr::new(Node::String(s), span)),
            TokenKind::Number(n) => Ok(Expr::new(Node::Number(n), span)),
            TokenKind::Float(f) => Ok(Expr::new(Node::Float(f), span)),
            TokenKind::Boolean(b) => Ok(Expr::new(Node::Boolean(b), span)),
        }
    }

    /// Unary ::= Primary | "+" Unary | "-" Unary
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let Some((op, op_span)) = self.match_op(&[Operator::Plus, Operator::Minus]) else {
            return self.parse_primary();
        };

        let operand = self.nested(op_span, Self::parse_unary)?;
        let origin = Some(op_span.to(operand.origin.unwrap_or(op_span)));

        if op == Operator::Minus {
            let negated = match &operand.node {
                Node::Number(n) => Some(Node::Number(-*n)),
                Node::Float(f) => Some(Node::Float(-*f)),
                _ => None,
            };
            if let Some(node) = negated {
                return Ok(Expr { node, origin });
            }
        }

        Ok(Expr {
            node: Node::Clause(op.clause_name().unwrap_or_default().to_string(), vec![operand]),
            origin,
        })
    }

    /// Operand (OP Operand)*, flattening runs of the same operator.
    ///
    /// Every switch of operator nests the tree one level deeper and counts
    /// towards [`MAX_DEPTH`] until the chain ends.
    fn parse_chain(
        &mut self,
        ops: &[Operator],
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let depth = self.depth;
        let mut expr = operand(self)?;

        while let Some((op, op_span)) = self.match_op(ops) {
            if !extends_chain(&expr, op) {
                self.enter(op_span)?;
            }
            let right = operand(self)?;
            expr = chain(expr, op, right);
        }
        self.depth = depth;
        Ok(expr)
    }

    /// Multiplicative ::= Unary (("*" | "/") Unary)*
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(&[Operator::Star, Operator::Slash], Self::parse_unary)
    }

    /// Additive ::= Multiplicative (("+" | "-") Multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(&[Operator::Plus, Operator::Minus], Self::parse_multiplicative)
    }

    /// Comparison ::= Additive (COMPARISON_OP Additive)?
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;

        if let Some((op, _)) = self.match_op(COMPARISON_OPS) {
            let right = self.parse_additive()?;
            return Ok(binary(left, op, right));
        }
        Ok(left)
    }

    /// BooleanUnary ::= Comparison | "NOT" BooleanUnary
    fn parse_boolean_unary(&mut self) -> Result<Expr, ParseError> {
        let Some((op, op_span)) = self.match_op(&[Operator::Not]) else {
            return self.parse_comparison();
        };

        let operand = self.nested(op_span, Self::parse_boolean_unary)?;
        let origin = Some(op_span.to(operand.origin.unwrap_or(op_span)));
        Ok(Expr {
            node: Node::Clause(op.clause_name().unwrap_or_default().to_string(), vec![operand]),
            origin,
        })
    }

    /// BooleanAnd ::= BooleanUnary ("AND" BooleanUnary)*
    fn parse_boolean_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(&[Operator::And], Self::parse_boolean_unary)
    }

    /// BooleanOr ::= BooleanAnd ("OR" BooleanAnd)*
    fn parse_boolean_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_chain(&[Operator::Or], Self::parse_boolean_and)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_boolean_or()
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if let Some(token) = self.peek() {
            return Err(ParseError::new(
                format!(
                    "Expecting end of expression but got {} instead",
                    token.text(self.source)
                ),
                token.span(),
            ));
        }
        Ok(expr)
    }
}

fn join(a: Option<Span>, b: Option<Span>) -> Option<Span> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.to(b)),
        (a, b) => a.or(b),
    }
}

fn binary(left: Expr, op: Operator, right: Expr) -> Expr {
    let origin = join(left.origin, right.origin);
    Expr {
        node: Node::Clause(
            op.clause_name().unwrap_or_default().to_string(),
            vec![left, right],
        ),
        origin,
    }
}

/// Unary forms have a single operand and are never extended.
fn extends_chain(left: &Expr, op: Operator) -> bool {
    matches!(
        &left.node,
        Node::Clause(existing, operands)
            if existing == op.clause_name().unwrap_or_default() && operands.len() >= 2
    )
}

/// Append to a same-operator chain instead of nesting: `1+2+3` is one clause.
fn chain(left: Expr, op: Operator, right: Expr) -> Expr {
    let name = op.clause_name().unwrap_or_default();
    let origin = join(left.origin, right.origin);

    match left.node {
        Node::Clause(existing, mut operands) if existing == name && operands.len() >= 2 => {
            operands.push(right);
            Expr {
                node: Node::Clause(existing, operands),
                origin,
            }
        }
        node => binary(
            Expr {
                node,
                origin: left.origin,
            },
            op,
            right,
        ),
    }
}

/// `[X-Men]` becomes `X-Men`.
fn shrink(text: &str) -> &str {
    let inner = text.strip_prefix('[').unwrap_or(text);
    inner.strip_suffix(']').unwrap_or(inner)
}

fn unescape_identifier(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(ch);
        }
    }
    result
}
