//! CLI support for custom-expr
//!
//! Provides programmatic access to the `cexpr` commands for embedding in
//! other tools.

mod check;
mod docs;

pub use check::{CheckOptions, CheckResult, execute_check, execute_compile};
pub use docs::{function_reference, functions_overview};

use std::io;

use thiserror::Error;

use crate::{compiler::CompileError, metadata::MetadataError};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid mode: {0}")]
    Mode(String),

    /// No expression given and nothing piped in
    #[error("No expression provided. Pass it as an argument or pipe it to stdin.")]
    NoInput,

    #[error("Unknown function: '{0}'\nRun 'cexpr functions' to see available functions.")]
    UnknownFunction(String),
}
