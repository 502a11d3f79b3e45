//! User-facing diagnosis of an expression being edited.
//!
//! Runs cheap token-level checks first, then a full compilation, then the
//! query engine's validator, and reports the first problem found.

use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::{
    ast::{Expr, Operator, Span, Token, TokenKind},
    catalog::{self, StartRule},
    compiler::{self, CompileOptions},
    lexer,
    metadata::Schema,
    validator::{ExpressionMode, ExpressionValidator},
};

const INVALID_EXPRESSION: &str = "Invalid expression";

/// A problem to show next to the expression editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// Set when the message comes from the validator and is meant for users
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Option<Span>) -> Self {
        Diagnostic {
            message: message.into(),
            friendly: None,
            span,
        }
    }
}

/// Everything [`diagnose`] needs to know about an expression.
#[derive(Clone, Copy, Default)]
pub struct DiagnoseRequest<'a> {
    pub source: &'a str,
    pub start_rule: StartRule,
    pub stage_index: usize,
    pub metadata: Option<&'a dyn Schema>,
    /// Custom column being edited
    pub name: Option<&'a str>,
    pub expression_index: Option<usize>,
    pub validator: Option<&'a dyn ExpressionValidator>,
}

impl<'a> DiagnoseRequest<'a> {
    pub fn new(source: &'a str, start_rule: StartRule) -> Self {
        DiagnoseRequest {
            source,
            start_rule,
            ..Default::default()
        }
    }
}

/// Report the first problem with `request.source`, or `None` if it is valid.
pub fn diagnose(request: &DiagnoseRequest<'_>) -> Option<Diagnostic> {
    if request.source.is_empty() {
        return None;
    }

    let tokenized = lexer::tokenize(request.source);
    if let Some(error) = tokenized.errors.first() {
        return Some(Diagnostic::new(error.message.clone(), Some(error.span)));
    }

    if let Some(diagnostic) = check_call_parentheses(request.source, &tokenized.tokens) {
        return Some(diagnostic);
    }

    let balance = count_matching_parentheses(&tokenized.tokens);
    if balance != 0 {
        return Some(Diagnostic::new(parentheses_message(balance), None));
    }

    let compiled = match compile_guarded(request) {
        Ok(expr) => expr,
        Err(diagnostic) => return Some(diagnostic),
    };

    request
        .validator
        .and_then(|validator| validate(request, validator, &compiled))
}

/// Open minus close parentheses.
pub fn count_matching_parentheses(tokens: &[Token]) -> i32 {
    tokens.iter().fold(0, |count, token| match token.operator() {
        Some(Operator::OpenParenthesis) => count + 1,
        Some(Operator::CloseParenthesis) => count - 1,
        _ => count,
    })
}

fn parentheses_message(balance: i32) -> String {
    match balance {
        1 => "Expecting a closing parenthesis".to_string(),
        n if n > 1 => format!("Expecting {} closing parentheses", n),
        -1 => "Expecting an opening parenthesis".to_string(),
        n => format!("Expecting {} opening parentheses", -n),
    }
}

/// A function name that takes arguments must be called: `COUNTIF [x]` is
/// missing its parentheses. The last token is not inspected.
fn check_call_parentheses(source: &str, tokens: &[Token]) -> Option<Diagnostic> {
    tokens.windows(2).find_map(|window| {
        let [token, next] = window else {
            return None;
        };
        if token.kind != TokenKind::Identifier {
            return None;
        }
        let text = token.text(source);
        if text.starts_with('[') {
            return None;
        }
        let spec = catalog::function_spec(text)?;
        if spec.args.is_empty() || next.is_op(Operator::OpenParenthesis) {
            return None;
        }
        Some(Diagnostic::new(
            format!("Expecting an opening parenthesis after function {}", text),
            Some(token.span()),
        ))
    })
}

fn compile_guarded(request: &DiagnoseRequest<'_>) -> Result<Expr, Diagnostic> {
    let options = CompileOptions {
        start_rule: request.start_rule,
        stage_index: request.stage_index,
        name: request.name,
        metadata: request.metadata,
    };

    match panic::catch_unwind(AssertUnwindSafe(|| compiler::compile(request.source, &options))) {
        Ok(Ok(expr)) => Ok(expr),
        Ok(Err(error)) => Err(Diagnostic::new(error.to_string(), error.span())),
        Err(_) => {
            tracing::warn!(source = request.source, "compiler failed unexpectedly");
            Err(Diagnostic::new(INVALID_EXPRESSION, None))
        }
    }
}

fn validate(
    request: &DiagnoseRequest<'_>,
    validator: &dyn ExpressionValidator,
    compiled: &Expr,
) -> Option<Diagnostic> {
    let mode = ExpressionMode::from(request.start_rule);
    match validator.diagnose_expression(request.stage_index, mode, compiled, request.expression_index) {
        Ok(None) => None,
        Ok(Some(issue)) if issue.friendly => Some(Diagnostic {
            message: issue.message,
            friendly: Some(true),
            span: None,
        }),
        Ok(Some(issue)) => {
            tracing::warn!(issue = %issue.message, "expression failed validation");
            Some(Diagnostic::new(INVALID_EXPRESSION, None))
        }
        Err(error) => {
            tracing::warn!(%error, "expression validator failed");
            Some(Diagnostic::new(INVALID_EXPRESSION, None))
        }
    }
}
