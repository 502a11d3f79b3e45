use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;

use crate::ast::Span;

/// An options object: named modifiers attached to a clause.
pub type Options = BTreeMap<String, Expr>;

/// Kind of a named reference, before binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A column of the query stage
    Dimension,
    /// A saved, pre-aggregated measure
    Metric,
    /// A saved, reusable filter
    Segment,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Dimension => "dimension",
            RefKind::Metric => "metric",
            RefKind::Segment => "segment",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference bound against schema metadata.
///
/// Only the name-binding step creates these; the parser never does.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedRef {
    /// Table column
    ///
    /// # Example
    /// ```text
    /// ["field", 12, {"base-type": "type/Integer"}]
    /// ```
    Field { id: i64, base_type: String },

    /// Custom column defined earlier in the same stage
    ///
    /// # Example
    /// ```text
    /// ["expression", "Profit", {"base-type": "type/Float"}]
    /// ```
    Expression { name: String, base_type: String },

    /// Saved metric
    ///
    /// # Example
    /// ```text
    /// ["metric", 3]
    /// ```
    Metric(i64),

    /// Saved segment
    ///
    /// # Example
    /// ```text
    /// ["segment", 7]
    /// ```
    Segment(i64),
}

impl ResolvedRef {
    pub fn base_type(&self) -> Option<&str> {
        match self {
            ResolvedRef::Field { base_type, .. } | ResolvedRef::Expression { base_type, .. } => {
                Some(base_type)
            }
            ResolvedRef::Metric(_) | ResolvedRef::Segment(_) => None,
        }
    }

    pub fn is_boolean(&self) -> bool {
        self.base_type() == Some("type/Boolean")
    }
}

/// Tree node of a custom expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals
    /// String literal
    ///
    /// # Example
    /// ```text
    /// "hello"
    /// ```
    String(String),

    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// -1.5
    /// ```
    Number(Decimal),

    /// Numeric literal outside the exact decimal range
    Float(f64),

    /// Boolean literal
    Boolean(bool),

    // References
    /// Unbound name
    ///
    /// # Example
    /// ```text
    /// [Total]        // Reference(Dimension, "Total")
    /// ```
    Reference(RefKind, String),

    /// Name bound to the schema
    Resolved(ResolvedRef),

    // Structure
    /// Operator followed by its operands
    ///
    /// # Examples
    /// ```text
    /// ["+", 1, 2, 3]
    /// ["is-null", ["dimension", "Discount"]]
    /// ```
    Clause(String, Vec<Expr>),

    /// Options object
    ///
    /// # Example
    /// ```text
    /// {"case-sensitive": false}
    /// ```
    Options(Options),

    /// Grouped `(test, value)` operands of `case` and `if`
    ///
    /// # Example
    /// ```text
    /// [[["<", x, 5], "low"], [["<", x, 10], "mid"]]
    /// ```
    Pairs(Vec<(Expr, Expr)>),
}

/// A node plus the source span it originates from.
///
/// The origin only serves error reporting: it takes no part in equality and
/// is never serialized.
#[derive(Debug, Clone)]
pub struct Expr {
    pub node: Node,
    pub origin: Option<Span>,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl From<Node> for Expr {
    fn from(node: Node) -> Self {
        Expr { node, origin: None }
    }
}

impl Expr {
    pub fn new(node: Node, origin: Span) -> Self {
        Expr {
            node,
            origin: Some(origin),
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Node::String(s.into()).into()
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        Node::Number(n.into()).into()
    }

    pub fn boolean(b: bool) -> Self {
        Node::Boolean(b).into()
    }

    pub fn dimension(name: impl Into<String>) -> Self {
        Node::Reference(RefKind::Dimension, name.into()).into()
    }

    pub fn clause(operator: impl Into<String>, operands: Vec<Expr>) -> Self {
        Node::Clause(operator.into(), operands).into()
    }

    pub fn options(options: Options) -> Self {
        Node::Options(options).into()
    }

    pub fn empty_options() -> Self {
        Node::Options(Options::new()).into()
    }

    /// Keep an existing origin, otherwise adopt `origin`.
    pub fn with_origin(mut self, origin: Option<Span>) -> Self {
        if self.origin.is_none() {
            self.origin = origin;
        }
        self
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self.node,
            Node::String(_) | Node::Number(_) | Node::Float(_) | Node::Boolean(_)
        )
    }

    pub fn is_options(&self) -> bool {
        matches!(self.node, Node::Options(_))
    }

    /// Operator name when this is a clause.
    pub fn operator(&self) -> Option<&str> {
        match &self.node {
            Node::Clause(op, _) => Some(op),
            _ => None,
        }
    }
}
