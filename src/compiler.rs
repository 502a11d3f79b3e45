//! End-to-end compilation of a custom expression.
//!
//! ```text
//! source -> tokenize -> parse -> rewrite passes -> resolve -> adjust_booleans
//! ```

use thiserror::Error;

use crate::{
    ast::{Expr, Node, RefKind, Span},
    catalog::StartRule,
    lexer::{self, LexError},
    metadata::Schema,
    output,
    parser::{self, ParseError},
    passes,
    resolver::{self, ResolveError},
};

/// Settings for a single compilation.
#[derive(Clone, Copy, Default)]
pub struct CompileOptions<'a> {
    pub start_rule: StartRule,
    /// Query stage whose columns are visible
    pub stage_index: usize,
    /// Name of the custom column being defined, hidden from its own body
    pub name: Option<&'a str>,
    /// Schema to bind references against; unbound when `None`
    pub metadata: Option<&'a dyn Schema>,
}

impl<'a> CompileOptions<'a> {
    pub fn new(start_rule: StartRule) -> Self {
        CompileOptions {
            start_rule,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: &'a dyn Schema) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_stage(mut self, stage_index: usize) -> Self {
        self.stage_index = stage_index;
        self
    }

    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl CompileError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Lex(e) => Some(e.span),
            CompileError::Parse(e) => e.span,
            CompileError::Resolve(e) => e.span(),
        }
    }
}

/// Compile `source` into a query clause tree.
pub fn compile(source: &str, options: &CompileOptions<'_>) -> Result<Expr, CompileError> {
    let tokenized = lexer::tokenize(source);
    if let Some(error) = tokenized.errors.into_iter().next() {
        return Err(error.into());
    }
    tracing::debug!(tokens = tokenized.tokens.len(), "tokenized expression");

    let tree = parser::parse(source, tokenized.tokens)?;
    tracing::debug!("parsed expression");

    let rewritten = passes::rewrite(&tree);
    let bind = |kind: RefKind, name: &str, reference: &Expr| bind_reference(options, kind, name, reference);
    let resolved = resolver::resolve(&rewritten, options.start_rule.expected_type(), &bind)?;
    tracing::debug!(start_rule = ?options.start_rule, "resolved expression");

    Ok(resolver::adjust_booleans(&resolved))
}

/// Compile `source` straight to its JSON form.
pub fn compile_to_json(
    source: &str,
    options: &CompileOptions<'_>,
) -> Result<serde_json::Value, CompileError> {
    compile(source, options).map(|expr| output::to_value(&expr))
}

fn bind_reference(
    options: &CompileOptions<'_>,
    kind: RefKind,
    name: &str,
    reference: &Expr,
) -> Result<Expr, ResolveError> {
    let Some(schema) = options.metadata else {
        return Ok(Node::Reference(kind, name.to_string()).into());
    };
    let stage = options.stage_index;
    let span = reference.origin;
    let field = |name: &str| {
        // a custom column cannot refer to itself
        if options.name.is_some_and(|own| own.eq_ignore_ascii_case(name)) {
            return None;
        }
        schema.field(stage, name)
    };

    let bound = match kind {
        RefKind::Metric => match schema.metric(stage, name) {
            Some(metric) => metric,
            None if field(name).is_some() => {
                return Err(ResolveError::NoAggregation {
                    name: name.to_string(),
                    span,
                });
            }
            None => {
                return Err(ResolveError::UnknownMetric {
                    name: name.to_string(),
                    span,
                });
            }
        },
        RefKind::Segment => match schema
            .segment(stage, name)
            .or_else(|| field(name).filter(|f| f.is_boolean()))
        {
            Some(segment) => segment,
            None => {
                return Err(ResolveError::UnknownSegment {
                    name: name.to_string(),
                    span,
                });
            }
        },
        RefKind::Dimension => field(name).ok_or_else(|| ResolveError::UnknownField {
            name: name.to_string(),
            span,
        })?,
    };
    Ok(Node::Resolved(bound).into())
}
