// tests/resolver_tests.rs

use std::cell::RefCell;

use custom_expr::ast::{Expr, Node, RefKind, ResolvedRef};
use custom_expr::catalog::ExprType;
use custom_expr::lexer::tokenize;
use custom_expr::output::to_value;
use custom_expr::parser::parse;
use custom_expr::passes;
use custom_expr::resolver::{ResolveError, adjust_booleans, reference_kind, resolve};
use serde_json::json;

fn rewritten(source: &str) -> Expr {
    passes::rewrite(&parse(source, tokenize(source).tokens).unwrap())
}

/// Resolve `source`, recording the kind every reference was bound with.
fn bound_kinds(source: &str, expected: ExprType) -> Vec<(RefKind, String)> {
    let seen = RefCell::new(vec![]);
    let bind = |kind: RefKind, name: &str, _: &Expr| {
        seen.borrow_mut().push((kind, name.to_string()));
        Ok(Expr::from(Node::Reference(kind, name.to_string())))
    };
    resolve(&rewritten(source), expected, &bind).unwrap();
    seen.into_inner()
}

#[test]
fn test_reference_kind_follows_context() {
    assert_eq!(reference_kind(ExprType::Aggregation), RefKind::Metric);
    assert_eq!(reference_kind(ExprType::Boolean), RefKind::Segment);
    assert_eq!(reference_kind(ExprType::Number), RefKind::Dimension);
}

#[test]
fn test_kinds_inside_aggregations() {
    assert_eq!(
        bound_kinds("Sum([A]) + [M]", ExprType::Aggregation),
        vec![
            (RefKind::Dimension, "A".to_string()),
            (RefKind::Metric, "M".to_string()),
        ]
    );
}

#[test]
fn test_kinds_inside_filters() {
    assert_eq!(
        bound_kinds("[S] OR [A] > 1", ExprType::Boolean),
        vec![
            (RefKind::Segment, "S".to_string()),
            (RefKind::Dimension, "A".to_string()),
        ]
    );
    assert_eq!(
        bound_kinds("CountIf([S])", ExprType::Aggregation),
        vec![(RefKind::Segment, "S".to_string())]
    );
}

#[test]
fn test_binding_errors_propagate() {
    let bind = |_: RefKind, name: &str, reference: &Expr| {
        Err(ResolveError::UnknownField {
            name: name.to_string(),
            span: reference.origin,
        })
    };
    let error = resolve(&rewritten("lower([X])"), ExprType::Expression, &bind).unwrap_err();
    assert!(error.is_unknown_reference());
    assert_eq!(error.to_string(), "Unknown Field: X");
}

#[test]
fn test_adjust_booleans_only_touches_boolean_columns() {
    let flag = Expr::from(Node::Resolved(ResolvedRef::Field {
        id: 4,
        base_type: "type/Boolean".into(),
    }));
    let amount = Expr::from(Node::Resolved(ResolvedRef::Field {
        id: 1,
        base_type: "type/Float".into(),
    }));
    let tree = Expr::clause(
        "and",
        vec![
            flag.clone(),
            Expr::clause(">", vec![amount, Expr::number(1)]),
            Expr::clause("=", vec![flag, Expr::boolean(false)]),
        ],
    );

    let adjusted = adjust_booleans(&tree);
    assert_eq!(
        to_value(&adjusted),
        json!([
            "and",
            ["=", ["field", 4, {"base-type": "type/Boolean"}], true],
            [">", ["field", 1, {"base-type": "type/Float"}], 1],
            ["=", ["field", 4, {"base-type": "type/Boolean"}], false]
        ])
    );
    assert_eq!(adjust_booleans(&adjusted), adjusted);
}

#[test]
fn test_adjust_booleans_wraps_segments_only_in_boolean_arguments() {
    let segment = Expr::from(Node::Resolved(ResolvedRef::Segment(20)));
    let tree = Expr::clause(
        "and",
        vec![
            segment.clone(),
            Expr::clause(
                "case",
                vec![Expr::from(Node::Pairs(vec![(segment, Expr::number(1))]))],
            ),
        ],
    );

    assert_eq!(
        to_value(&adjust_booleans(&tree)),
        json!([
            "and",
            ["=", ["segment", 20], true],
            ["case", [[["segment", 20], 1]]]
        ])
    );
}
