//! # Custom Expressions - Abstract Syntax Tree
//!
//! This module defines the tokens and tree nodes for custom expressions, the
//! small formula language end users type into a query builder to define
//! custom columns, aggregations and filters.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens and source spans produced by the lexer
//! - **[operators]** - Punctuation, comparison and logical operators
//! - **[expressions]** - Tree nodes (literals, references, clauses, options)
//!
//! ## Quick Start
//!
//! ```text
//! COUNTIF([Total] - [Tax] < 5)
//! ```
//!
//! compiles (in aggregation mode) into the clause tree
//!
//! ```text
//! ["count-where", ["<", ["-", ["field", 1, {...}], ["field", 2, {...}]], 5]]
//! ```
//!
//! ## Core Concepts
//!
//! ### Clauses
//!
//! Every non-leaf node is a clause: an operator name followed by its operands.
//! Chains of the same arithmetic or boolean operator are kept flat:
//!
//! ```text
//! 1 + 2 + 3          ["+", 1, 2, 3]
//! A and B and C      ["and", A, B, C]
//! ```
//!
//! ### References
//!
//! Bracketed or bare names become references. The parser always produces
//! dimension references; the resolver decides from context whether a name is
//! a field, a metric or a segment and binds it against schema metadata:
//!
//! ```text
//! [Created At]       ["dimension", "Created At"]
//! ```
//!
//! ### Options
//!
//! Some clauses carry an options object with modifiers rather than positional
//! data:
//!
//! ```text
//! contains([Name], "ab", "case-insensitive")
//! ["contains", ["dimension", "Name"], "ab", {"case-sensitive": false}]
//! ```
//!
//! ### Provenance
//!
//! Each [`Expr`] remembers the source [`Span`] it was parsed from. Rewrites
//! keep that origin so that resolution errors raised late in the pipeline
//! can still point at the offending text.
pub mod tokens;
pub mod operators;
pub mod expressions;

pub use tokens::{Span, Token, TokenKind};
pub use operators::Operator;
pub use expressions::{Expr, Node, Options, RefKind, ResolvedRef};
