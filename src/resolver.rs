//! Name binding and static checking of rewritten expressions.
//!
//! The resolver walks a tree produced by the rewrite passes, checks every
//! clause against the catalog (known operator, return type, arity) and
//! hands each bare reference to a binding function that turns it into a
//! schema-backed reference.

use thiserror::Error;

use crate::{
    ast::{Expr, Node, RefKind, ResolvedRef, Span},
    catalog::{self, ClauseSpec, ExprType, clause_spec},
    passes::modify,
};

/// Failure to bind or type-check an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("Unknown Field: {name}")]
    UnknownField { name: String, span: Option<Span> },

    #[error("Unknown Metric: {name}")]
    UnknownMetric { name: String, span: Option<Span> },

    /// A plain field where an aggregation is expected
    #[error("No aggregation found in: {name}. Use functions like Sum() or custom Metrics")]
    NoAggregation { name: String, span: Option<Span> },

    #[error("Unknown Segment: {name}")]
    UnknownSegment { name: String, span: Option<Span> },

    #[error("Unknown function {name}")]
    UnknownFunction { name: String, span: Option<Span> },

    /// Wrong number of arguments in a call
    #[error("{message}")]
    Arity { message: String, span: Option<Span> },

    #[error("Expecting {expected} but found {found}")]
    TypeMismatch {
        expected: ExprType,
        found: String,
        span: Option<Span>,
    },
}

impl ResolveError {
    pub fn span(&self) -> Option<Span> {
        match self {
            ResolveError::UnknownField { span, .. }
            | ResolveError::UnknownMetric { span, .. }
            | ResolveError::NoAggregation { span, .. }
            | ResolveError::UnknownSegment { span, .. }
            | ResolveError::UnknownFunction { span, .. }
            | ResolveError::Arity { span, .. }
            | ResolveError::TypeMismatch { span, .. } => *span,
        }
    }

    /// Whether the error names an unbound reference.
    pub fn is_unknown_reference(&self) -> bool {
        matches!(
            self,
            ResolveError::UnknownField { .. }
                | ResolveError::UnknownMetric { .. }
                | ResolveError::NoAggregation { .. }
                | ResolveError::UnknownSegment { .. }
        )
    }
}

/// Reference kind a bare name takes where `expected` is expected.
pub fn reference_kind(expected: ExprType) -> RefKind {
    match expected {
        ExprType::Aggregation => RefKind::Metric,
        ExprType::Boolean => RefKind::Segment,
        _ => RefKind::Dimension,
    }
}

/// Bind and check `expr`, which must produce a value of type `expected`.
///
/// `bind` receives the reference kind implied by the context, the name and
/// the reference node itself (for its origin).
pub fn resolve<F>(expr: &Expr, expected: ExprType, bind: &F) -> Result<Expr, ResolveError>
where
    F: Fn(RefKind, &str, &Expr) -> Result<Expr, ResolveError>,
{
    match &expr.node {
        Node::Reference(_, name) => {
            let bound = bind(reference_kind(expected), name, expr)?;
            Ok(bound.with_origin(expr.origin))
        }
        Node::Clause(operator, operands) => resolve_clause(expr, operator, operands, expected, bind),
        Node::String(_) | Node::Number(_) | Node::Float(_) | Node::Boolean(_) => {
            let actual = literal_type(&expr.node);
            if !expected.accepts(actual) {
                return Err(ResolveError::TypeMismatch {
                    expected,
                    found: describe_literal(&expr.node),
                    span: expr.origin,
                });
            }
            Ok(expr.clone())
        }
        Node::Resolved(_) | Node::Options(_) | Node::Pairs(_) => Ok(expr.clone()),
    }
}

fn resolve_clause<F>(
    expr: &Expr,
    operator: &str,
    operands: &[Expr],
    expected: ExprType,
    bind: &F,
) -> Result<Expr, ResolveError>
where
    F: Fn(RefKind, &str, &Expr) -> Result<Expr, ResolveError>,
{
    let spec = clause_spec(operator).ok_or_else(|| ResolveError::UnknownFunction {
        name: operator.to_string(),
        span: expr.origin,
    })?;

    if !expected.accepts(spec.kind) {
        return Err(ResolveError::TypeMismatch {
            expected,
            found: format!("function {} returning {}", spec.display_name, spec.kind),
            span: expr.origin,
        });
    }

    if catalog::is_case_or_if(operator)
        && let Some((pairs, options)) = grouped_case(operands)
    {
        return resolve_case_or_if(expr, spec, pairs, options, expected, bind);
    }

    check_arity(expr, spec, operands)?;

    let mut position = 0;
    let mut resolved = Vec::with_capacity(operands.len());
    for operand in operands {
        if operand.is_options() {
            resolved.push(operand.clone());
            continue;
        }
        let operand = match spec.arg_type(position) {
            Some(declared) => resolve(operand, argument_type(spec, declared, expected), bind)?,
            // trailing options carrier of a fixed-arity clause
            None => operand.clone(),
        };
        resolved.push(operand);
        position += 1;
    }

    Ok(Expr {
        node: Node::Clause(operator.to_string(), resolved),
        origin: expr.origin,
    })
}

/// Operands of `case`/`if` after grouping: `[pairs]` or `[pairs, {default: v}]`.
fn grouped_case(operands: &[Expr]) -> Option<(&Expr, Option<&Expr>)> {
    let (pairs, options) = match operands {
        [pairs] => (pairs, None),
        [pairs, options] if options.is_options() => (pairs, Some(options)),
        _ => return None,
    };
    matches!(pairs.node, Node::Pairs(_)).then_some((pairs, options))
}

fn resolve_case_or_if<F>(
    expr: &Expr,
    spec: &ClauseSpec,
    pairs_expr: &Expr,
    options: Option<&Expr>,
    expected: ExprType,
    bind: &F,
) -> Result<Expr, ResolveError>
where
    F: Fn(RefKind, &str, &Expr) -> Result<Expr, ResolveError>,
{
    let pairs = match &pairs_expr.node {
        Node::Pairs(pairs) => pairs.as_slice(),
        _ => &[],
    };
    if pairs.is_empty() {
        return Err(ResolveError::Arity {
            message: format!("Function {} expects at least 2 arguments", spec.display_name),
            span: expr.origin,
        });
    }

    let mut resolved_pairs = Vec::with_capacity(pairs.len());
    for (test, value) in pairs {
        resolved_pairs.push((
            resolve(test, ExprType::Boolean, bind)?,
            resolve(value, expected, bind)?,
        ));
    }

    let mut resolved = vec![Expr {
        node: Node::Pairs(resolved_pairs),
        origin: pairs_expr.origin,
    }];
    if let Some(options) = options
        && let Node::Options(entries) = &options.node
    {
        let mut adjusted = entries.clone();
        if let Some(default) = entries.get("default") {
            adjusted.insert("default".to_string(), resolve(default, expected, bind)?);
        }
        resolved.push(Expr {
            node: Node::Options(adjusted),
            origin: options.origin,
        });
    }

    Ok(Expr {
        node: Node::Clause(spec.name.to_string(), resolved),
        origin: expr.origin,
    })
}

fn check_arity(expr: &Expr, spec: &ClauseSpec, operands: &[Expr]) -> Result<(), ResolveError> {
    let count = operands.iter().filter(|e| !e.is_options()).count();
    let declared = spec.args.len();
    let plural = if declared == 1 { "argument" } else { "arguments" };

    if spec.multiple {
        if count < declared {
            return Err(ResolveError::Arity {
                message: format!(
                    "Function {} expects at least {} {}",
                    spec.display_name, declared, plural
                ),
                span: expr.origin,
            });
        }
    } else {
        let max = declared + usize::from(spec.has_options);
        if count < declared || count > max {
            return Err(ResolveError::Arity {
                message: format!(
                    "Function {} expects {} {}",
                    spec.display_name, declared, plural
                ),
                span: expr.origin,
            });
        }
    }
    Ok(())
}

/// Type an operand is resolved against. Numeric and generic arguments of
/// non-aggregate clauses stay in aggregation context, so `Sum([A]) / 2`
/// works while `[A] / 2` does not.
fn argument_type(spec: &ClauseSpec, declared: ExprType, expected: ExprType) -> ExprType {
    match declared {
        ExprType::Any => expected,
        ExprType::Number | ExprType::Expression
            if expected == ExprType::Aggregation && spec.kind != ExprType::Aggregation =>
        {
            ExprType::Aggregation
        }
        other => other,
    }
}

fn literal_type(node: &Node) -> ExprType {
    match node {
        Node::String(_) => ExprType::String,
        Node::Number(_) | Node::Float(_) => ExprType::Number,
        Node::Boolean(_) => ExprType::Boolean,
        _ => ExprType::Any,
    }
}

fn describe_literal(node: &Node) -> String {
    match node {
        Node::String(s) => format!("\"{}\"", s),
        Node::Number(n) => n.normalize().to_string(),
        Node::Float(f) => f.to_string(),
        Node::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Compare boolean columns and segments against `true` where the catalog
/// expects a boolean argument. `case`/`if` tests only wrap boolean columns.
///
/// ```text
/// ["and", ["field", 4, {"base-type": "type/Boolean"}], ["segment", 20]]
///     =>  ["and", ["=", ["field", 4, {...}], true], ["=", ["segment", 20], true]]
/// ```
pub fn adjust_booleans(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, operands) = &node.node else {
            return node;
        };

        if catalog::is_case_or_if(operator) {
            let adjusted = operands
                .iter()
                .map(|operand| match &operand.node {
                    Node::Pairs(pairs) => Expr {
                        node: Node::Pairs(
                            pairs
                                .iter()
                                .map(|(test, value)| {
                                    let test = if is_boolean_column(test) {
                                        compare_to_true(test)
                                    } else {
                                        test.clone()
                                    };
                                    (test, value.clone())
                                })
                                .collect(),
                        ),
                        origin: operand.origin,
                    },
                    _ => operand.clone(),
                })
                .collect();
            return Expr::clause(operator.as_str(), adjusted).with_origin(node.origin);
        }

        let Some(spec) = clause_spec(operator) else {
            return node;
        };
        let mut position = 0;
        let mut adjusted = Vec::with_capacity(operands.len());
        for operand in operands {
            if operand.is_options() {
                adjusted.push(operand.clone());
                continue;
            }
            let wrapped = is_boolean_column(operand)
                || matches!(operand.node, Node::Resolved(ResolvedRef::Segment(_)));
            if wrapped && spec.arg_type(position) == Some(ExprType::Boolean) {
                adjusted.push(compare_to_true(operand));
            } else {
                adjusted.push(operand.clone());
            }
            position += 1;
        }
        Expr::clause(operator.as_str(), adjusted).with_origin(node.origin)
    })
}

fn is_boolean_column(operand: &Expr) -> bool {
    matches!(&operand.node, Node::Resolved(reference) if reference.is_boolean())
}

fn compare_to_true(operand: &Expr) -> Expr {
    Expr::clause("=", vec![operand.clone(), Expr::boolean(true)]).with_origin(operand.origin)
}
