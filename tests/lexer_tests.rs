// tests/lexer_tests.rs

use custom_expr::ast::{Operator, Span, TokenKind};
use custom_expr::lexer::{Lexer, tokenize};
use rust_decimal::Decimal;

fn kinds(source: &str) -> Vec<TokenKind> {
    let tokenized = tokenize(source);
    assert!(tokenized.errors.is_empty(), "{:?}", tokenized.errors);
    tokenized.tokens.into_iter().map(|t| t.kind).collect()
}

fn first_error(source: &str) -> (String, Span) {
    let error = tokenize(source).errors.into_iter().next().expect("an error");
    (error.message, error.span)
}

// ============================================================================
// Tokens
// ============================================================================

#[test]
fn test_operators() {
    assert_eq!(
        kinds("( ) , + - * / = != < > <= >="),
        vec![
            TokenKind::Operator(Operator::OpenParenthesis),
            TokenKind::Operator(Operator::CloseParenthesis),
            TokenKind::Operator(Operator::Comma),
            TokenKind::Operator(Operator::Plus),
            TokenKind::Operator(Operator::Minus),
            TokenKind::Operator(Operator::Star),
            TokenKind::Operator(Operator::Slash),
            TokenKind::Operator(Operator::Equal),
            TokenKind::Operator(Operator::NotEqual),
            TokenKind::Operator(Operator::LessThan),
            TokenKind::Operator(Operator::GreaterThan),
            TokenKind::Operator(Operator::LessThanEqual),
            TokenKind::Operator(Operator::GreaterThanEqual),
        ]
    );
}

#[test]
fn test_numbers() {
    assert_eq!(
        kinds("42 3.14 .5 1.5e3 2E-2"),
        vec![
            TokenKind::Number(Decimal::from(42)),
            TokenKind::Number(Decimal::new(314, 2)),
            TokenKind::Number(Decimal::new(5, 1)),
            TokenKind::Number(Decimal::from(1500)),
            TokenKind::Number(Decimal::new(2, 2)),
        ]
    );
}

#[test]
fn test_numbers_beyond_decimal_range() {
    assert_eq!(
        kinds("1e30 100000000000000000000000000000 1.5e-40"),
        vec![
            TokenKind::Float(1e30),
            TokenKind::Float(1e29),
            TokenKind::Float(1.5e-40),
        ]
    );
}

#[test]
fn test_strings() {
    assert_eq!(
        kinds(r#""a\"b" 'it\'s' "tab\there" "\u0041""#),
        vec![
            TokenKind::String("a\"b".into()),
            TokenKind::String("it's".into()),
            TokenKind::String("tab\there".into()),
            TokenKind::String("A".into()),
        ]
    );
}

#[test]
fn test_identifiers() {
    let source = r"Total [Created At] [A\]B] _x.y";
    let tokens = tokenize(source).tokens;
    let texts: Vec<_> = tokens.iter().map(|t| t.text(source)).collect();
    assert_eq!(texts, vec!["Total", "[Created At]", r"[A\]B]", "_x.y"]);
    assert!(tokens.iter().all(|t| t.kind == TokenKind::Identifier));
}

#[test]
fn test_keywords_any_case() {
    assert_eq!(
        kinds("[A] And [B] oR nOt TRUE"),
        vec![
            TokenKind::Identifier,
            TokenKind::Operator(Operator::And),
            TokenKind::Identifier,
            TokenKind::Operator(Operator::Or),
            TokenKind::Operator(Operator::Not),
            TokenKind::Boolean(true),
        ]
    );
}

#[test]
fn test_spans_are_byte_offsets() {
    let source = "[Prix €] * 2";
    let tokens = tokenize(source).tokens;
    assert_eq!(tokens[0].span(), Span::new(0, 10));
    assert_eq!(tokens[1].span(), Span::new(11, 12));
    assert_eq!(tokens[2].text(source), "2");
}

#[test]
fn test_streaming_api() {
    let mut lexer = Lexer::new("1 +");
    assert!(matches!(
        lexer.next_token(),
        Ok(Some(token)) if token.kind == TokenKind::Number(Decimal::from(1))
    ));
    assert!(matches!(lexer.next_token(), Ok(Some(token)) if token.is_op(Operator::Plus)));
    assert!(matches!(lexer.next_token(), Ok(None)));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_closing_quotes() {
    assert_eq!(
        first_error(r#"concat("abc"#),
        ("Missing closing quotes".to_string(), Span::new(7, 11))
    );
}

#[test]
fn test_bracket_errors() {
    assert_eq!(first_error("[Total").0, "Missing a closing bracket");
    assert_eq!(
        first_error("[A [B]]").0,
        "Bracket identifier in another bracket identifier"
    );
}

#[test]
fn test_invalid_characters() {
    assert_eq!(
        first_error("[A] ! [B]"),
        ("Invalid character: !".to_string(), Span::new(4, 5))
    );
    assert_eq!(first_error("1 # 2").0, "Invalid character: #");
}

#[test]
fn test_invalid_number() {
    assert_eq!(first_error("1e999").0, "Invalid number: 1e999");
}

#[test]
fn test_scan_stops_at_first_error() {
    let tokenized = tokenize(r#"1 + "x"#);
    assert_eq!(tokenized.tokens.len(), 2);
    assert_eq!(tokenized.errors.len(), 1);
}
