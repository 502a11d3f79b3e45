//! Normalization passes applied to a parsed expression before binding.
//!
//! Every pass is a pure function from tree to tree. Clauses are rewritten
//! bottom-up (operands first), and the rewritten node keeps the source
//! origin of the node it replaces unless it already carries one.

use crate::{
    ast::{Expr, Node, Options},
    catalog::{self, clause_spec},
};

/// A rewrite pass.
pub type Pass = fn(&Expr) -> Expr;

/// All passes, in the order [`rewrite`] applies them.
pub const PASSES: [(&str, Pass); 6] = [
    ("adjust-options", adjust_options),
    ("use-shorthands", use_shorthands),
    ("adjust-offset", adjust_offset),
    ("adjust-case-or-if", adjust_case_or_if),
    ("adjust-multi-arg-options", adjust_multi_arg_options),
    ("adjust-top-level-literal", adjust_top_level_literal),
];

/// Apply every pass in order.
pub fn rewrite(expr: &Expr) -> Expr {
    PASSES.iter().fold(expr.clone(), |tree, (name, pass)| {
        let next = pass(&tree);
        if next != tree {
            tracing::trace!(pass = *name, "rewrote expression");
        }
        next
    })
}

/// Rebuild `expr` bottom-up, handing each rebuilt node to `transform`.
///
/// Descends into clause operands, `case` pairs and options values.
pub fn modify<F>(expr: &Expr, transform: &F) -> Expr
where
    F: Fn(Expr) -> Expr,
{
    let node = match &expr.node {
        Node::Clause(operator, operands) => Node::Clause(
            operator.clone(),
            operands.iter().map(|e| modify(e, transform)).collect(),
        ),
        Node::Pairs(pairs) => Node::Pairs(
            pairs
                .iter()
                .map(|(test, value)| (modify(test, transform), modify(value, transform)))
                .collect(),
        ),
        Node::Options(options) => Node::Options(
            options
                .iter()
                .map(|(key, value)| (key.clone(), modify(value, transform)))
                .collect(),
        ),
        other => other.clone(),
    };
    let rebuilt = Expr {
        node,
        origin: expr.origin,
    };
    transform(rebuilt).with_origin(expr.origin)
}

fn rebuild(operator: &str, operands: Vec<Expr>, from: &Expr) -> Expr {
    Expr::clause(operator, operands).with_origin(from.origin)
}

/// Replace the legacy option shorthands that may trail an options-taking
/// clause with structured options.
///
/// ```text
/// ["contains", A, "b", "case-insensitive"]  =>  ["contains", A, "b", {"case-sensitive": false}]
/// ["time-interval", A, -1, "day", "include-current"]  =>  [..., {"include-current": true}]
/// ```
pub fn adjust_options(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, operands) = &node.node else {
            return node;
        };
        let Some(spec) = clause_spec(operator) else {
            return node;
        };
        if !spec.has_options || operands.is_empty() || operands.len() <= spec.args.len() {
            return node;
        }

        let replacement = match operands.last().map(|e| &e.node) {
            Some(Node::String(s)) if s == "case-insensitive" => ("case-sensitive", false),
            Some(Node::String(s)) if s == "include-current" => ("include-current", true),
            _ => return node,
        };

        let mut options = Options::new();
        options.insert(replacement.0.to_string(), Expr::boolean(replacement.1));
        let last = operands.len() - 1;
        let mut adjusted = operands[..last].to_vec();
        adjusted.push(Expr::options(options).with_origin(operands[last].origin));
        rebuild(operator, adjusted, &node)
    })
}

fn negated(operator: &str) -> Option<&'static str> {
    match operator {
        "contains" => Some("does-not-contain"),
        "is-null" => Some("not-null"),
        "is-empty" => Some("not-empty"),
        "does-not-contain" => Some("contains"),
        "not-null" => Some("is-null"),
        "not-empty" => Some("is-empty"),
        _ => None,
    }
}

/// Fold a `not` into the clause it negates.
///
/// ```text
/// ["not", ["is-null", A]]    =>  ["not-null", A]
/// ["not", ["not-empty", A]]  =>  ["is-empty", A]
/// ["not", ["not", X]]        =>  X
/// ```
pub fn use_shorthands(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, operands) = &node.node else {
            return node;
        };
        if operator != "not" || operands.len() != 1 {
            return node;
        }
        let Node::Clause(inner, params) = &operands[0].node else {
            return node;
        };

        if inner == "not" && params.len() == 1 {
            return params[0].clone();
        }
        match negated(inner) {
            Some(shorthand) => rebuild(shorthand, params.clone(), &node),
            None => node,
        }
    })
}

/// Give `offset` its (empty) options object.
///
/// ```text
/// ["offset", X, -1]  =>  ["offset", {}, X, -1]
/// ```
pub fn adjust_offset(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, operands) = &node.node else {
            return node;
        };
        if operator != "offset" || operands.first().is_some_and(Expr::is_options) {
            return node;
        }
        let mut adjusted = vec![Expr::empty_options()];
        adjusted.extend(operands.iter().cloned());
        rebuild(operator, adjusted, &node)
    })
}

/// Group the flat operands of `case` and `if` into test/value pairs, with
/// an odd trailing operand as the default.
///
/// ```text
/// ["case", T1, V1, T2, V2, D]  =>  ["case", [[T1, V1], [T2, V2]], {"default": D}]
/// ```
pub fn adjust_case_or_if(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, operands) = &node.node else {
            return node;
        };
        if !catalog::is_case_or_if(operator)
            || operands.first().is_some_and(|e| matches!(e.node, Node::Pairs(_)))
        {
            return node;
        }

        let pairs: Vec<(Expr, Expr)> = operands
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        let pairs_origin = operands
            .first()
            .and_then(|e| e.origin)
            .zip(operands.last().and_then(|e| e.origin))
            .map(|(first, last)| first.to(last));
        let mut adjusted = vec![Expr {
            node: Node::Pairs(pairs),
            origin: pairs_origin,
        }];

        if operands.len() % 2 == 1
            && let Some(default) = operands.last()
        {
            let mut options = Options::new();
            options.insert("default".to_string(), default.clone());
            adjusted.push(Expr::options(options).with_origin(default.origin));
        }
        rebuild(operator, adjusted, &node)
    })
}

/// Clauses taking several values and options (such as `contains`) need the
/// options object first once they have more than two values.
///
/// ```text
/// ["contains", A, "x", "y"]                   =>  ["contains", {}, A, "x", "y"]
/// ["contains", A, "x", "y", {"case-sensitive": false}]
///     =>  ["contains", {"case-sensitive": false}, A, "x", "y"]
/// ```
pub fn adjust_multi_arg_options(expr: &Expr) -> Expr {
    modify(expr, &|node| {
        let Node::Clause(operator, args) = &node.node else {
            return node;
        };
        let Some(spec) = clause_spec(operator) else {
            return node;
        };
        if !(spec.multiple && spec.has_options) || args.first().is_some_and(Expr::is_options) {
            return node;
        }

        let trailing_options = args.last().is_some_and(Expr::is_options);
        if trailing_options && args.len() > 3 {
            let last = args.len() - 1;
            let mut adjusted = vec![args[last].clone()];
            adjusted.extend(args[..last].iter().cloned());
            return rebuild(operator, adjusted, &node);
        }
        if !trailing_options && args.len() > 2 {
            let mut adjusted = vec![Expr::empty_options()];
            adjusted.extend(args.iter().cloned());
            return rebuild(operator, adjusted, &node);
        }
        node
    })
}

/// Wrap a bare literal so the compiled output is always a clause.
///
/// ```text
/// 42  =>  ["value", 42]
/// ```
pub fn adjust_top_level_literal(expr: &Expr) -> Expr {
    if expr.is_literal() {
        rebuild("value", vec![expr.clone()], expr)
    } else {
        expr.clone()
    }
}
