//! Expression syntax tree

/// Expression AST
///
/// Built from a substituted expression, so it never contains references:
/// only literals, operators and calls with literal arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaExpr {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),

    /// Left-associative run of same-precedence operators
    ///
    /// `1-2+3` is `first: 1, rest: [(Subtract, 2), (Add, 3)]`. Long sums stay
    /// flat instead of nesting one level per operator.
    Chain {
        first: Box<FormulaExpr>,
        rest: Vec<(BinaryOperator, FormulaExpr)>,
    },
    /// Unary operation
    UnaryOp {
        op: UnaryOperator,
        operand: Box<FormulaExpr>,
    },

    /// Function call
    Function { name: String, args: Vec<CallArg> },
}

/// A literal function argument
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Number(f64),
    String(String),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
}
