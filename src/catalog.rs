//! Static catalog of the clauses a custom expression may use.
//!
//! Each entry describes the clause name emitted in compiled output, the
//! function name users type, the value type it returns, the declared
//! argument types and whether it carries an options object.
//!
//! The table is immutable and indexed once on first use.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Value type of an expression or of a declared argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprType {
    /// Any scalar: number, string, boolean or datetime
    Expression,
    /// Aggregated value (only valid in aggregation mode)
    Aggregation,
    Boolean,
    Number,
    String,
    Datetime,
    /// Takes the type expected by the surrounding context
    Any,
}

impl ExprType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExprType::Expression => "expression",
            ExprType::Aggregation => "aggregation",
            ExprType::Boolean => "boolean",
            ExprType::Number => "number",
            ExprType::String => "string",
            ExprType::Datetime => "datetime",
            ExprType::Any => "any",
        }
    }

    /// Whether a value of type `actual` may appear where `self` is expected.
    pub fn accepts(self, actual: ExprType) -> bool {
        use ExprType::*;
        match (self, actual) {
            (a, b) if a == b => true,
            (Any, _) | (_, Any) => true,
            // expression-typed functions (case, coalesce, ...) fit anywhere
            // a scalar fits
            (Number | String | Boolean | Datetime, Expression) => true,
            (Expression, Number | String | Boolean | Datetime) => true,
            (Aggregation, Number | Expression) => true,
            (Datetime, String) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grammar mode an expression is compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartRule {
    /// Custom column
    #[default]
    Expression,
    /// Custom aggregation (summarize)
    Aggregation,
    /// Custom filter
    Boolean,
}

impl StartRule {
    pub fn expected_type(self) -> ExprType {
        match self {
            StartRule::Expression => ExprType::Expression,
            StartRule::Aggregation => ExprType::Aggregation,
            StartRule::Boolean => ExprType::Boolean,
        }
    }
}

impl FromStr for StartRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expression" => Ok(StartRule::Expression),
            "aggregation" => Ok(StartRule::Aggregation),
            "boolean" | "filter" => Ok(StartRule::Boolean),
            other => Err(format!(
                "unknown mode '{}' (expected expression, aggregation or boolean)",
                other
            )),
        }
    }
}

/// Shape of one clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseSpec {
    /// Clause name in compiled output, e.g. `count-where`
    pub name: &'static str,
    /// Function name shown to users, e.g. `CountIf`
    pub display_name: &'static str,
    /// Type of the value the clause produces
    pub kind: ExprType,
    /// Declared positional arguments
    pub args: &'static [ExprType],
    /// Accepts a trailing options object
    pub has_options: bool,
    /// Accepts any number of arguments beyond `args`
    pub multiple: bool,
    /// Database feature the clause depends on
    pub requires_feature: Option<&'static str>,
}

const fn clause(
    name: &'static str,
    display_name: &'static str,
    kind: ExprType,
    args: &'static [ExprType],
) -> ClauseSpec {
    ClauseSpec {
        name,
        display_name,
        kind,
        args,
        has_options: false,
        multiple: false,
        requires_feature: None,
    }
}

impl ClauseSpec {
    const fn with_options(mut self) -> Self {
        self.has_options = true;
        self
    }

    const fn variadic(mut self) -> Self {
        self.multiple = true;
        self
    }

    const fn requires(mut self, feature: &'static str) -> Self {
        self.requires_feature = Some(feature);
        self
    }

    /// Declared type of the positional argument at `position`. Variadic
    /// clauses repeat their last declared type.
    pub fn arg_type(&self, position: usize) -> Option<ExprType> {
        match self.args.get(position) {
            Some(t) => Some(*t),
            None if self.multiple => self.args.last().copied(),
            None => None,
        }
    }
}

use ExprType::{
    Aggregation as AGG, Any as ANY, Boolean as BOOL, Datetime as DATE, Expression as EXPR,
    Number as NUM, String as STR,
};

pub static CLAUSES: &[ClauseSpec] = &[
    // Aggregations
    clause("count", "Count", AGG, &[]),
    clause("cum-count", "CumulativeCount", AGG, &[]),
    clause("sum", "Sum", AGG, &[NUM]),
    clause("cum-sum", "CumulativeSum", AGG, &[NUM]),
    clause("distinct", "Distinct", AGG, &[EXPR]),
    clause("stddev", "StandardDeviation", AGG, &[NUM]).requires("standard-deviation-aggregations"),
    clause("var", "Variance", AGG, &[NUM]).requires("standard-deviation-aggregations"),
    clause("avg", "Average", AGG, &[NUM]),
    clause("median", "Median", AGG, &[NUM]).requires("percentile-aggregations"),
    clause("percentile", "Percentile", AGG, &[NUM, NUM]).requires("percentile-aggregations"),
    clause("min", "Min", AGG, &[EXPR]),
    clause("max", "Max", AGG, &[EXPR]),
    clause("share", "Share", AGG, &[BOOL]),
    clause("count-where", "CountIf", AGG, &[BOOL]),
    clause("sum-where", "SumIf", AGG, &[NUM, BOOL]),
    clause("offset", "Offset", ANY, &[EXPR, NUM]).requires("window-functions/offset"),
    // Strings
    clause("lower", "lower", STR, &[STR]),
    clause("upper", "upper", STR, &[STR]),
    clause("substring", "substring", STR, &[STR, NUM, NUM]),
    clause("regex-match-first", "regexextract", STR, &[STR, STR]).requires("regex"),
    clause("concat", "concat", STR, &[EXPR]).variadic(),
    clause("trim", "trim", STR, &[STR]),
    clause("ltrim", "ltrim", STR, &[STR]),
    clause("rtrim", "rtrim", STR, &[STR]),
    clause("replace", "replace", STR, &[STR, STR, STR]),
    clause("length", "length", NUM, &[STR]),
    // Numbers
    clause("abs", "abs", NUM, &[NUM]),
    clause("floor", "floor", NUM, &[NUM]),
    clause("ceil", "ceil", NUM, &[NUM]),
    clause("round", "round", NUM, &[NUM]),
    clause("sqrt", "sqrt", NUM, &[NUM]),
    clause("power", "power", NUM, &[NUM, NUM]),
    clause("log", "log", NUM, &[NUM]),
    clause("exp", "exp", NUM, &[NUM]),
    // Dates
    clause("now", "now", DATE, &[]),
    clause("get-year", "year", NUM, &[DATE]),
    clause("get-month", "month", NUM, &[DATE]),
    clause("get-day", "day", NUM, &[DATE]),
    clause("datetime-add", "datetimeAdd", DATE, &[DATE, NUM, STR]),
    clause("datetime-diff", "datetimeDiff", NUM, &[DATE, DATE, STR]),
    // Filters
    clause("between", "between", BOOL, &[EXPR, EXPR, EXPR]),
    clause("time-interval", "interval", BOOL, &[EXPR, NUM, STR]).with_options(),
    clause("is-null", "isNull", BOOL, &[EXPR]),
    clause("not-null", "notNull", BOOL, &[EXPR]),
    clause("is-empty", "isEmpty", BOOL, &[EXPR]),
    clause("not-empty", "notEmpty", BOOL, &[EXPR]),
    clause("contains", "contains", BOOL, &[STR, STR]).with_options().variadic(),
    clause("does-not-contain", "doesNotContain", BOOL, &[STR, STR]).with_options().variadic(),
    clause("starts-with", "startsWith", BOOL, &[STR, STR]).with_options().variadic(),
    clause("ends-with", "endsWith", BOOL, &[STR, STR]).with_options().variadic(),
    clause("in", "in", BOOL, &[EXPR, EXPR]).variadic(),
    clause("not-in", "notIn", BOOL, &[EXPR, EXPR]).variadic(),
    // Logical
    clause("and", "AND", BOOL, &[BOOL, BOOL]).variadic(),
    clause("or", "OR", BOOL, &[BOOL, BOOL]).variadic(),
    clause("not", "NOT", BOOL, &[BOOL]),
    // Comparison
    clause("=", "=", BOOL, &[EXPR, EXPR]),
    clause("!=", "!=", BOOL, &[EXPR, EXPR]),
    clause("<", "<", BOOL, &[EXPR, EXPR]),
    clause("<=", "<=", BOOL, &[EXPR, EXPR]),
    clause(">", ">", BOOL, &[EXPR, EXPR]),
    clause(">=", ">=", BOOL, &[EXPR, EXPR]),
    // Arithmetic; `+` and `-` also take a single operand in unary form
    clause("+", "+", NUM, &[NUM]).variadic(),
    clause("-", "-", NUM, &[NUM]).variadic(),
    clause("*", "*", NUM, &[NUM, NUM]).variadic(),
    clause("/", "/", NUM, &[NUM, NUM]).variadic(),
    // Conditionals
    clause("case", "case", EXPR, &[BOOL, EXPR]).variadic(),
    clause("if", "if", EXPR, &[BOOL, EXPR]).variadic(),
    clause("coalesce", "coalesce", EXPR, &[EXPR, EXPR]).variadic(),
    // Wrapper for a bare literal at the top of an expression
    clause("value", "value", ANY, &[ANY]),
];

static BY_NAME: LazyLock<HashMap<&'static str, &'static ClauseSpec>> =
    LazyLock::new(|| CLAUSES.iter().map(|c| (c.name, c)).collect());

static BY_FUNCTION: LazyLock<HashMap<String, &'static str>> = LazyLock::new(|| {
    CLAUSES
        .iter()
        .filter(|c| c.display_name.chars().any(char::is_alphabetic))
        .map(|c| (c.display_name.to_lowercase(), c.name))
        .collect()
});

/// Look up a clause by its compiled name.
pub fn clause_spec(name: &str) -> Option<&'static ClauseSpec> {
    BY_NAME.get(name).copied()
}

/// Clause name for a function name as typed by a user, case-insensitive.
///
/// Logical keywords are operators, not functions, and never match.
pub fn mbql_name(function: &str) -> Option<&'static str> {
    let key = function.trim().to_lowercase();
    match key.as_str() {
        "and" | "or" | "not" => None,
        _ => BY_FUNCTION.get(&key).copied(),
    }
}

/// Catalog entry for a function name as typed by a user.
pub fn function_spec(function: &str) -> Option<&'static ClauseSpec> {
    mbql_name(function).and_then(clause_spec)
}

pub fn is_case_or_if(operator: &str) -> bool {
    operator == "case" || operator == "if"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_are_case_insensitive() {
        assert_eq!(mbql_name("COUNTIF"), Some("count-where"));
        assert_eq!(mbql_name(" isnull "), Some("is-null"));
        assert_eq!(mbql_name("Sum"), Some("sum"));
        assert_eq!(mbql_name("and"), None);
        assert_eq!(mbql_name("nope"), None);
    }

    #[test]
    fn every_clause_name_is_unique() {
        assert_eq!(BY_NAME.len(), CLAUSES.len());
    }

    #[test]
    fn type_compatibility() {
        assert!(ExprType::Expression.accepts(ExprType::Number));
        assert!(ExprType::Number.accepts(ExprType::Expression));
        assert!(ExprType::Aggregation.accepts(ExprType::Number));
        assert!(!ExprType::Expression.accepts(ExprType::Aggregation));
        assert!(!ExprType::Boolean.accepts(ExprType::Number));
    }
}
