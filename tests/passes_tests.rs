// tests/passes_tests.rs

use custom_expr::ast::{Expr, Span};
use custom_expr::lexer::tokenize;
use custom_expr::output::to_value;
use custom_expr::parser::parse;
use custom_expr::passes::{self, PASSES};
use serde_json::{Value, json};

fn parsed(source: &str) -> Expr {
    parse(source, tokenize(source).tokens).unwrap()
}

fn rewritten(source: &str) -> Value {
    to_value(&passes::rewrite(&parsed(source)))
}

const SAMPLES: &[&str] = &[
    r#"contains([A], "b", "case-insensitive")"#,
    r#"contains([A], "b", "c", "case-insensitive")"#,
    r#"startsWith([A], "b", "c")"#,
    r#"interval([D], -1, "day", "include-current")"#,
    "NOT isNull([A])",
    "NOT NOT [A]",
    "Offset(Sum([A]), -1)",
    r#"case([A] > 1, "big", [A] > 0, "small", "none")"#,
    r#"if([A] > 1, "y")"#,
    "42",
    "[A] + 1",
];

// ============================================================================
// Individual passes
// ============================================================================

#[test]
fn test_option_shorthands() {
    assert_eq!(
        rewritten(r#"contains([A], "b", "case-insensitive")"#),
        json!(["contains", ["dimension", "A"], "b", {"case-sensitive": false}])
    );
    assert_eq!(
        rewritten(r#"interval([D], -1, "day", "include-current")"#),
        json!(["time-interval", ["dimension", "D"], -1, "day", {"include-current": true}])
    );
    // an ordinary trailing value is left alone
    assert_eq!(
        rewritten(r#"contains([A], "b", "c")"#),
        json!(["contains", {}, ["dimension", "A"], "b", "c"])
    );
}

#[test]
fn test_negation_shorthands() {
    assert_eq!(
        rewritten("NOT isnull([X])"),
        json!(["not-null", ["dimension", "X"]])
    );
    assert_eq!(
        rewritten(r#"NOT contains([X], "a")"#),
        json!(["does-not-contain", ["dimension", "X"], "a"])
    );
    assert_eq!(
        rewritten("NOT notEmpty([X])"),
        json!(["is-empty", ["dimension", "X"]])
    );
    assert_eq!(rewritten("NOT NOT [X]"), json!(["dimension", "X"]));
    assert_eq!(
        rewritten("NOT [X]"),
        json!(["not", ["dimension", "X"]])
    );
}

#[test]
fn test_offset_gets_options() {
    assert_eq!(
        rewritten("Offset(Sum([A]), -1)"),
        json!(["offset", {}, ["sum", ["dimension", "A"]], -1])
    );
}

#[test]
fn test_case_grouping() {
    assert_eq!(
        rewritten("case(a, b, c, d, e)"),
        json!([
            "case",
            [[["dimension", "a"], ["dimension", "b"]], [["dimension", "c"], ["dimension", "d"]]],
            {"default": ["dimension", "e"]}
        ])
    );
    assert_eq!(
        rewritten(r#"if([A] > 1, "y")"#),
        json!(["if", [[[">", ["dimension", "A"], 1], "y"]]])
    );
}

#[test]
fn test_multi_arg_options_move_first() {
    assert_eq!(
        rewritten(r#"contains([A], "b", "c", "case-insensitive")"#),
        json!(["contains", {"case-sensitive": false}, ["dimension", "A"], "b", "c"])
    );
    assert_eq!(
        rewritten(r#"endsWith([A], "b")"#),
        json!(["ends-with", ["dimension", "A"], "b"])
    );
}

#[test]
fn test_multi_value_contains_always_leads_with_options() {
    for source in [
        r#"contains([A], "b", "c")"#,
        r#"contains([A], "b", "c", "d")"#,
        r#"contains([A], "b", "c", "case-insensitive")"#,
    ] {
        let Value::Array(items) = rewritten(source) else {
            panic!("{} did not rewrite to a clause", source);
        };
        assert!(items[1].is_object(), "{}", source);
    }
}

#[test]
fn test_top_level_literal() {
    assert_eq!(rewritten("42"), json!(["value", 42]));
    assert_eq!(rewritten(r#""x""#), json!(["value", "x"]));
    assert_eq!(rewritten("[A]"), json!(["dimension", "A"]));
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_each_pass_is_idempotent() {
    for source in SAMPLES {
        let tree = passes::rewrite(&parsed(source));
        for (name, pass) in PASSES {
            let once = pass(&tree);
            assert_eq!(pass(&once), once, "{} on {}", name, source);
        }
        assert_eq!(passes::rewrite(&tree), tree, "{}", source);
    }
}

#[test]
fn test_passes_on_raw_trees_are_idempotent() {
    for source in SAMPLES {
        let tree = parsed(source);
        for (name, pass) in PASSES {
            let once = pass(&tree);
            assert_eq!(pass(&once), once, "{} on {}", name, source);
        }
    }
}

#[test]
fn test_rewrites_keep_origins() {
    let source = "NOT isNull([A])";
    let expr = passes::rewrite(&parsed(source));
    assert_eq!(expr.operator(), Some("not-null"));
    assert_eq!(expr.origin, Some(Span::new(0, source.len())));

    let source = "Offset(Sum([A]), -1)";
    let expr = passes::rewrite(&parsed(source));
    assert_eq!(expr.origin, Some(Span::new(0, source.len())));
}
