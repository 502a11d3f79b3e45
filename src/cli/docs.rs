//! Function reference for the cexpr CLI, generated from the clause catalog

use super::CliError;
use crate::catalog::{CLAUSES, ClauseSpec, ExprType, function_spec};

/// Catalog sections, in listing order
const SECTIONS: &[(&str, ExprType)] = &[
    ("AGGREGATIONS", ExprType::Aggregation),
    ("STRINGS", ExprType::String),
    ("NUMBERS", ExprType::Number),
    ("DATES", ExprType::Datetime),
    ("FILTERS", ExprType::Boolean),
    ("CONDITIONALS", ExprType::Expression),
];

/// Functions users can call by name; operators are excluded.
fn callable(spec: &ClauseSpec) -> bool {
    spec.display_name.chars().any(char::is_alphabetic)
        && !matches!(spec.name, "and" | "or" | "not" | "value")
}

/// `contains(string, string, ... [, options])`
pub fn signature(spec: &ClauseSpec) -> String {
    let mut args: Vec<String> = spec.args.iter().map(|t| t.to_string()).collect();
    if spec.multiple {
        args.push("...".to_string());
    }
    let mut signature = format!("{}({})", spec.display_name, args.join(", "));
    if spec.has_options {
        signature.insert_str(signature.len() - 1, " [, options]");
    }
    signature
}

/// Get the function listing
pub fn functions_overview() -> String {
    let mut out = String::from("CUSTOM EXPRESSION FUNCTIONS\n");

    for (title, kind) in SECTIONS {
        out.push_str(&format!("\n{}\n\n", title));
        for spec in CLAUSES.iter().filter(|c| callable(c)) {
            // offset returns whatever its argument does
            let section = if spec.kind == ExprType::Any {
                ExprType::Aggregation
            } else {
                spec.kind
            };
            if section == *kind {
                out.push_str(&format!("  {}\n", signature(spec)));
            }
        }
    }

    out.push_str(
        "\nOPERATORS\n\n  + - * /  = != < <= > >=  AND OR NOT\n\
         \nRun 'cexpr function <name>' for details on one function.\n",
    );
    out
}

/// Get the reference entry for one function, by its user-facing name
pub fn function_reference(name: &str) -> Result<String, CliError> {
    let spec = function_spec(name).ok_or_else(|| CliError::UnknownFunction(name.to_string()))?;

    let mut out = format!(
        "{}\n\n  clause:   {}\n  returns:  {}\n",
        signature(spec),
        spec.name,
        spec.kind
    );
    if let Some(feature) = spec.requires_feature {
        out.push_str(&format!("  requires: database feature '{}'\n", feature));
    }
    Ok(out)
}
