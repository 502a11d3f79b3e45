//! JSON form of compiled expressions.
//!
//! Clauses become arrays headed by their operator, options become objects
//! and bound references take their query-language shape. Origins are
//! dropped. Object keys come out sorted.
//!
//! # Examples
//!
//! ```
//! use custom_expr::ast::Expr;
//! use custom_expr::output::to_json;
//!
//! let expr = Expr::clause("+", vec![Expr::number(1), Expr::number(2)]);
//! assert_eq!(to_json(&expr), r#"["+",1,2]"#);
//! ```

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde_json::{Map, Number, Value, json};

use crate::ast::{Expr, Node, ResolvedRef};

/// Convert an expression tree to a `serde_json` value.
pub fn to_value(expr: &Expr) -> Value {
    match &expr.node {
        Node::String(s) => Value::String(s.clone()),
        Node::Number(n) => number(*n),
        Node::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Node::Boolean(b) => Value::Bool(*b),
        Node::Reference(kind, name) => json!([kind.as_str(), name]),
        Node::Resolved(reference) => resolved(reference),
        Node::Clause(operator, operands) => {
            let mut items = Vec::with_capacity(operands.len() + 1);
            items.push(Value::String(operator.clone()));
            items.extend(operands.iter().map(to_value));
            Value::Array(items)
        }
        Node::Options(options) => Value::Object(
            options
                .iter()
                .map(|(key, value)| (key.clone(), to_value(value)))
                .collect::<Map<_, _>>(),
        ),
        Node::Pairs(pairs) => Value::Array(
            pairs
                .iter()
                .map(|(test, value)| Value::Array(vec![to_value(test), to_value(value)]))
                .collect(),
        ),
    }
}

/// Integral values print without a fraction; anything else as a float.
fn number(n: Decimal) -> Value {
    let n = n.normalize();
    if n.fract().is_zero()
        && let Some(i) = n.to_i64()
    {
        return Value::Number(i.into());
    }
    n.to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

fn resolved(reference: &ResolvedRef) -> Value {
    match reference {
        ResolvedRef::Field { id, base_type } => json!(["field", id, { "base-type": base_type }]),
        ResolvedRef::Expression { name, base_type } => {
            json!(["expression", name, { "base-type": base_type }])
        }
        ResolvedRef::Metric(id) => json!(["metric", id]),
        ResolvedRef::Segment(id) => json!(["segment", id]),
    }
}

/// Compact JSON text.
pub fn to_json(expr: &Expr) -> String {
    to_value(expr).to_string()
}

/// JSON text with two-space indentation.
pub fn to_json_pretty(expr: &Expr) -> String {
    format!("{:#}", to_value(expr))
}
