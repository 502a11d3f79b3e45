//! Diagnose and compile expressions from the command line

use std::path::PathBuf;

use super::CliError;
use crate::{
    catalog::StartRule,
    compiler::{self, CompileOptions},
    diagnostics::{self, DiagnoseRequest, Diagnostic},
    metadata::{Metadata, Schema},
    output,
    validator::FeatureValidator,
};

/// Options shared by `check` and `compile`
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression source
    pub expression: String,
    /// Mode name: expression, aggregation or boolean
    pub mode: String,
    /// Schema metadata JSON file
    pub metadata: Option<PathBuf>,
    pub stage_index: usize,
    /// Custom column being edited
    pub name: Option<String>,
    pub expression_index: Option<usize>,
    /// Pretty-print compiled output
    pub pretty: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    Valid,
    Invalid(Diagnostic),
}

impl CheckOptions {
    fn start_rule(&self) -> Result<StartRule, CliError> {
        if self.mode.is_empty() {
            return Ok(StartRule::default());
        }
        self.mode.parse().map_err(CliError::Mode)
    }

    fn load_metadata(&self) -> Result<Option<Metadata>, CliError> {
        match &self.metadata {
            Some(path) => Ok(Some(Metadata::from_path(path)?)),
            None => Ok(None),
        }
    }
}

/// Diagnose an expression the way an editor would
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let start_rule = options.start_rule()?;
    let metadata = options.load_metadata()?;
    let validator = FeatureValidator::new(
        metadata
            .as_ref()
            .and_then(|m| m.database_features())
            .map(<[String]>::to_vec),
    );

    let request = DiagnoseRequest {
        source: options.expression.trim(),
        start_rule,
        stage_index: options.stage_index,
        metadata: metadata.as_ref().map(|m| m as &dyn Schema),
        name: options.name.as_deref(),
        expression_index: options.expression_index,
        validator: Some(&validator),
    };

    Ok(match diagnostics::diagnose(&request) {
        Some(diagnostic) => CheckResult::Invalid(diagnostic),
        None => CheckResult::Valid,
    })
}

/// Compile an expression and render it as JSON
pub fn execute_compile(options: &CheckOptions) -> Result<String, CliError> {
    let start_rule = options.start_rule()?;
    let metadata = options.load_metadata()?;

    let compile_options = CompileOptions {
        start_rule,
        stage_index: options.stage_index,
        name: options.name.as_deref(),
        metadata: metadata.as_ref().map(|m| m as &dyn Schema),
    };
    let expr = compiler::compile(options.expression.trim(), &compile_options)?;

    Ok(if options.pretty {
        output::to_json_pretty(&expr)
    } else {
        output::to_json(&expr)
    })
}
