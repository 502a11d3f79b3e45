// tests/compiler_tests.rs

use custom_expr::ast::Span;
use custom_expr::catalog::StartRule;
use custom_expr::compiler::{CompileError, CompileOptions, compile, compile_to_json};
use custom_expr::metadata::Metadata;
use custom_expr::resolver::ResolveError;
use serde_json::{Value, json};

const METADATA: &str = r#"{
    "database": { "name": "Sample", "features": ["percentile-aggregations"] },
    "stages": [{
        "fields": [
            { "id": 1, "name": "TOTAL", "display_name": "Total", "table": "Orders", "base_type": "type/Float" },
            { "id": 2, "name": "TAX", "display_name": "Tax", "table": "Orders", "base_type": "type/Float" },
            { "id": 3, "name": "CREATED_AT", "display_name": "Created At", "table": "Orders", "base_type": "type/DateTime" },
            { "id": 4, "name": "IS_PAID", "display_name": "Is Paid", "table": "Orders", "base_type": "type/Boolean" },
            { "id": 5, "name": "NAME", "display_name": "Name", "table": "People", "base_type": "type/Text" },
            { "name": "Profit", "base_type": "type/Float", "custom": true }
        ],
        "metrics": [{ "id": 10, "name": "Revenue" }],
        "segments": [{ "id": 20, "name": "Big Orders" }]
    }]
}"#;

fn metadata() -> Metadata {
    Metadata::from_json(METADATA).unwrap()
}

fn compiled(source: &str, start_rule: StartRule) -> Value {
    let metadata = metadata();
    let options = CompileOptions::new(start_rule).with_metadata(&metadata);
    compile_to_json(source, &options).unwrap()
}

fn compile_error(source: &str, start_rule: StartRule) -> CompileError {
    let metadata = metadata();
    let options = CompileOptions::new(start_rule).with_metadata(&metadata);
    compile(source, &options).unwrap_err()
}

fn unbound(source: &str, start_rule: StartRule) -> Value {
    compile_to_json(source, &CompileOptions::new(start_rule)).unwrap()
}

fn field(id: i64, base_type: &str) -> Value {
    json!(["field", id, {"base-type": base_type}])
}

// ============================================================================
// Binding
// ============================================================================

#[test]
fn test_count_where() {
    assert_eq!(
        compiled("COUNTIF([Total] - [Tax] < 5)", StartRule::Aggregation),
        json!(["count-where", ["<", ["-", field(1, "type/Float"), field(2, "type/Float")], 5]])
    );
}

#[test]
fn test_without_metadata_references_stay_unbound() {
    assert_eq!(
        unbound("[A] + 1", StartRule::Expression),
        json!(["+", ["dimension", "A"], 1])
    );
    assert_eq!(
        unbound("[Big Orders]", StartRule::Boolean),
        json!(["segment", "Big Orders"])
    );
    assert_eq!(
        unbound("[Revenue] * 2", StartRule::Aggregation),
        json!(["*", ["metric", "Revenue"], 2])
    );
}

#[test]
fn test_fields_by_table_prefix() {
    assert_eq!(
        compiled("lower([People → Name])", StartRule::Expression),
        json!(["lower", field(5, "type/Text")])
    );
}

#[test]
fn test_segments() {
    assert_eq!(
        compiled("[Big Orders]", StartRule::Boolean),
        json!(["segment", 20])
    );
    // a boolean column stands in for a segment
    assert_eq!(
        compiled("[Is Paid]", StartRule::Boolean),
        field(4, "type/Boolean")
    );
}

#[test]
fn test_boolean_columns_are_compared_to_true() {
    assert_eq!(
        compiled("[Is Paid] AND [Total] > 10", StartRule::Boolean),
        json!([
            "and",
            ["=", field(4, "type/Boolean"), true],
            [">", field(1, "type/Float"), 10]
        ])
    );
    assert_eq!(
        compiled("case([Is Paid], 1, 0)", StartRule::Expression),
        json!(["case", [[["=", field(4, "type/Boolean"), true], 1]], {"default": 0}])
    );
}

#[test]
fn test_segments_in_boolean_arguments_are_compared_to_true() {
    assert_eq!(
        compiled("[Big Orders] AND [Total] > 1", StartRule::Boolean),
        json!([
            "and",
            ["=", ["segment", 20], true],
            [">", field(1, "type/Float"), 1]
        ])
    );
    assert_eq!(
        compiled("CountIf([Big Orders])", StartRule::Aggregation),
        json!(["count-where", ["=", ["segment", 20], true]])
    );
}

#[test]
fn test_large_numbers() {
    assert_eq!(
        compiled("[Total] * -1e30", StartRule::Expression),
        json!(["*", field(1, "type/Float"), -1e30])
    );
}

#[test]
fn test_metrics_and_aggregations() {
    assert_eq!(
        compiled("[Revenue] / 2", StartRule::Aggregation),
        json!(["/", ["metric", 10], 2])
    );
    assert_eq!(
        compiled("Sum([Total]) / Count()", StartRule::Aggregation),
        json!(["/", ["sum", field(1, "type/Float")], ["count"]])
    );
    assert_eq!(
        compiled("Offset(Sum([Total]), -1)", StartRule::Aggregation),
        json!(["offset", {}, ["sum", field(1, "type/Float")], -1])
    );
}

#[test]
fn test_custom_columns() {
    assert_eq!(
        compiled("[Profit] + 1", StartRule::Expression),
        json!(["+", ["expression", "Profit", {"base-type": "type/Float"}], 1])
    );

    let metadata = metadata();
    let options = CompileOptions::new(StartRule::Expression)
        .with_metadata(&metadata)
        .with_name("Profit");
    assert_eq!(
        compile("[Profit] + 1", &options).unwrap_err().to_string(),
        "Unknown Field: Profit"
    );
}

#[test]
fn test_contains_with_options() {
    assert_eq!(
        compiled(r#"contains([Name], "ab", "case-insensitive")"#, StartRule::Boolean),
        json!(["contains", field(5, "type/Text"), "ab", {"case-sensitive": false}])
    );
    assert_eq!(
        compiled(r#"contains([Name], "a", "b", "c")"#, StartRule::Boolean),
        json!(["contains", {}, field(5, "type/Text"), "a", "b", "c"])
    );
}

#[test]
fn test_case_with_default() {
    assert_eq!(
        compiled(r#"case([Total] > 10, "big", "small")"#, StartRule::Expression),
        json!(["case", [[[">", field(1, "type/Float"), 10], "big"]], {"default": "small"}])
    );
}

#[test]
fn test_top_level_literal() {
    assert_eq!(compiled("42", StartRule::Expression), json!(["value", 42]));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_references() {
    assert_eq!(
        compile_error("[Nope]", StartRule::Expression).to_string(),
        "Unknown Field: Nope"
    );
    assert_eq!(
        compile_error("[Nope]", StartRule::Aggregation).to_string(),
        "Unknown Metric: Nope"
    );
    assert_eq!(
        compile_error("[Nope]", StartRule::Boolean).to_string(),
        "Unknown Segment: Nope"
    );
}

#[test]
fn test_field_used_as_metric() {
    let error = compile_error("[Total]", StartRule::Aggregation);
    assert!(matches!(
        error,
        CompileError::Resolve(ResolveError::NoAggregation { .. })
    ));
    assert_eq!(
        error.to_string(),
        "No aggregation found in: Total. Use functions like Sum() or custom Metrics"
    );
}

#[test]
fn test_error_spans() {
    let error = compile_error("[Total] + [Nope]", StartRule::Expression);
    assert_eq!(error.span(), Some(Span::new(10, 16)));

    let error = compile_error("1 2", StartRule::Expression);
    assert!(matches!(error, CompileError::Parse(_)));
    assert_eq!(error.span(), Some(Span::new(2, 3)));

    let error = compile_error(r#""abc"#, StartRule::Expression);
    assert!(matches!(error, CompileError::Lex(_)));
    assert_eq!(error.to_string(), "Missing closing quotes");
}

#[test]
fn test_arity() {
    assert_eq!(
        compile_error("Sum([Total], [Tax])", StartRule::Aggregation).to_string(),
        "Function Sum expects 1 argument"
    );
    assert_eq!(
        compile_error("between([Total], 1)", StartRule::Boolean).to_string(),
        "Function between expects 3 arguments"
    );
    assert_eq!(
        compile_error("concat()", StartRule::Expression).to_string(),
        "Function concat expects at least 1 argument"
    );
    assert_eq!(
        compile_error("case([Total] > 1)", StartRule::Expression).to_string(),
        "Function case expects at least 2 arguments"
    );
}

#[test]
fn test_unknown_function_fails_in_resolution() {
    let error = compile_error("Frobnicate(1)", StartRule::Expression);
    assert!(matches!(
        error,
        CompileError::Resolve(ResolveError::UnknownFunction { .. })
    ));
    assert_eq!(error.to_string(), "Unknown function Frobnicate");
}

#[test]
fn test_type_mismatches() {
    assert_eq!(
        compile_error("Sum([Total])", StartRule::Expression).to_string(),
        "Expecting expression but found function Sum returning aggregation"
    );
    assert_eq!(
        compile_error(r#"Sum("x")"#, StartRule::Aggregation).to_string(),
        r#"Expecting number but found "x""#
    );
    assert_eq!(
        compile_error("[Big Orders] AND 1", StartRule::Boolean).to_string(),
        "Expecting boolean but found 1"
    );
}
