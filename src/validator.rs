//! Semantic validation of compiled expressions by the query engine.
//!
//! The engine knows things the compiler does not, such as which functions
//! the target database supports. Diagnostics consults it through
//! [`ExpressionValidator`] once an expression compiles.

use std::fmt;

use thiserror::Error;

use crate::{
    ast::{Expr, Node},
    catalog::{StartRule, clause_spec},
};

/// Context a compiled expression is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionMode {
    Expression,
    Aggregation,
    Filter,
}

impl From<StartRule> for ExpressionMode {
    fn from(rule: StartRule) -> Self {
        match rule {
            StartRule::Expression => ExpressionMode::Expression,
            StartRule::Aggregation => ExpressionMode::Aggregation,
            StartRule::Boolean => ExpressionMode::Filter,
        }
    }
}

impl fmt::Display for ExpressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpressionMode::Expression => "expression",
            ExpressionMode::Aggregation => "aggregation",
            ExpressionMode::Filter => "filter",
        })
    }
}

/// Problem found by a validator.
///
/// Friendly issues are worded for end users and shown as is; anything else
/// is reported generically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub message: String,
    pub friendly: bool,
}

impl ValidationIssue {
    pub fn friendly(message: impl Into<String>) -> Self {
        ValidationIssue {
            message: message.into(),
            friendly: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ValidationIssue {
            message: message.into(),
            friendly: false,
        }
    }
}

/// The validator itself failed.
#[derive(Debug, Error)]
#[error("validator failed: {0}")]
pub struct ValidatorError(pub String);

pub trait ExpressionValidator {
    /// Inspect a compiled clause. `Ok(None)` means it is valid.
    fn diagnose_expression(
        &self,
        stage_index: usize,
        mode: ExpressionMode,
        clause: &Expr,
        expression_index: Option<usize>,
    ) -> Result<Option<ValidationIssue>, ValidatorError>;
}

/// Checks clauses against the features a database supports.
#[derive(Debug, Clone, Default)]
pub struct FeatureValidator {
    /// `None` allows every feature
    pub features: Option<Vec<String>>,
}

impl FeatureValidator {
    pub fn new(features: Option<Vec<String>>) -> Self {
        FeatureValidator { features }
    }

    fn supports(&self, feature: &str) -> bool {
        self.features
            .as_ref()
            .is_none_or(|features| features.iter().any(|f| f == feature))
    }

    fn check(&self, expr: &Expr, mode: ExpressionMode) -> Option<ValidationIssue> {
        match &expr.node {
            Node::Clause(operator, operands) => {
                if operator == "offset" {
                    match mode {
                        ExpressionMode::Expression => {
                            return Some(ValidationIssue::friendly(
                                "OFFSET is not supported in custom columns",
                            ));
                        }
                        ExpressionMode::Filter => {
                            return Some(ValidationIssue::friendly(
                                "OFFSET is not supported in custom filters",
                            ));
                        }
                        ExpressionMode::Aggregation => {}
                    }
                }
                if let Some(spec) = clause_spec(operator)
                    && let Some(feature) = spec.requires_feature
                    && !self.supports(feature)
                {
                    return Some(ValidationIssue::friendly(format!(
                        "{} is not supported by this database",
                        spec.display_name
                    )));
                }
                operands.iter().find_map(|operand| self.check(operand, mode))
            }
            Node::Pairs(pairs) => pairs
                .iter()
                .find_map(|(test, value)| self.check(test, mode).or_else(|| self.check(value, mode))),
            Node::Options(options) => options.values().find_map(|value| self.check(value, mode)),
            _ => None,
        }
    }
}

impl ExpressionValidator for FeatureValidator {
    fn diagnose_expression(
        &self,
        stage_index: usize,
        mode: ExpressionMode,
        clause: &Expr,
        _expression_index: Option<usize>,
    ) -> Result<Option<ValidationIssue>, ValidatorError> {
        if matches!(clause.node, Node::Options(_) | Node::Pairs(_)) {
            return Ok(Some(ValidationIssue::internal(format!(
                "stage {}: compiled {} is not an expression",
                stage_index, mode
            ))));
        }
        Ok(self.check(clause, mode))
    }
}
