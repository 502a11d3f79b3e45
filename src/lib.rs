pub mod ast;
pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compiler;
pub mod diagnostics;
pub mod lexer;
pub mod metadata;
pub mod output;
pub mod parser;
pub mod passes;
pub mod resolver;
pub mod validator;

pub use ast::{Expr, Node, Operator, RefKind, ResolvedRef, Span, Token, TokenKind};
pub use catalog::{ExprType, StartRule};
pub use compiler::{CompileError, CompileOptions, compile, compile_to_json};
pub use diagnostics::{DiagnoseRequest, Diagnostic, diagnose};
pub use lexer::{LexError, Lexer, tokenize};
pub use metadata::{Metadata, Schema};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse};
pub use resolver::ResolveError;
pub use validator::{ExpressionMode, ExpressionValidator, FeatureValidator, ValidationIssue};
