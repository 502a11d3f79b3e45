/// Operators recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Punctuation
    /// Argument separator (`,`)
    Comma,
    /// `(`
    OpenParenthesis,
    /// `)`
    CloseParenthesis,

    // Arithmetic
    /// Addition, or unary plus (`+`)
    Plus,
    /// Subtraction, or unary minus (`-`)
    Minus,
    /// Multiplication (`*`)
    Star,
    /// Division (`/`)
    Slash,

    // Comparison
    /// Equal (`=`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessThanEqual,
    /// Greater than or equal (`>=`)
    GreaterThanEqual,

    // Logical
    /// Logical negation (`NOT`, any case)
    Not,
    /// Logical AND (`AND`, any case)
    And,
    /// Logical OR (`OR`, any case)
    Or,
}

impl Operator {
    /// Name of the clause this operator builds, `None` for punctuation.
    pub fn clause_name(self) -> Option<&'static str> {
        use Operator::*;
        let name = match self {
            Comma | OpenParenthesis | CloseParenthesis => return None,
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Equal => "=",
            NotEqual => "!=",
            LessThan => "<",
            GreaterThan => ">",
            LessThanEqual => "<=",
            GreaterThanEqual => ">=",
            Not => "not",
            And => "and",
            Or => "or",
        };
        Some(name)
    }

    /// Human-readable name used in parser messages.
    pub fn describe(self) -> &'static str {
        match self {
            Operator::Comma => "comma",
            Operator::OpenParenthesis => "opening parenthesis",
            Operator::CloseParenthesis => "closing parenthesis",
            other => other.clause_name().unwrap_or("operator"),
        }
    }
}
