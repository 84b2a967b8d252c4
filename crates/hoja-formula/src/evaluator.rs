//! Expression evaluator
//!
//! Evaluates substituted expressions to produce values. Only the grammar
//! accepted by [`parse_formula`] can reach evaluation.

use crate::ast::{BinaryOperator, CallArg, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::FunctionRegistry;
use crate::number::{coerce_number, format_number};
use crate::parser::parse_formula;
use hoja_core::CellError;

/// Value types during evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
}

impl FormulaValue {
    /// Convert to a number for arithmetic
    ///
    /// Numeric text is coerced and empty text is zero. Text holding an error
    /// code propagates that error; any other text is an evaluation error.
    pub fn to_number(&self) -> FormulaResult<f64> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::String(s) => {
                if let Some(code) = CellError::from_display(s) {
                    return Err(FormulaError::Propagated(code));
                }
                coerce_number(s).ok_or_else(|| {
                    FormulaError::Evaluation(format!("Cannot convert '{}' to number", s))
                })
            }
        }
    }

    /// Convert to the display string stored as a computed value
    ///
    /// Fails for infinite and NaN results.
    pub fn to_display(&self) -> FormulaResult<String> {
        match self {
            FormulaValue::Number(n) if n.is_finite() => Ok(format_number(*n)),
            FormulaValue::Number(n) => Err(FormulaError::InvalidResultType(format_number(*n))),
            FormulaValue::String(s) => Ok(s.clone()),
        }
    }

    /// Interpret a function's string result
    fn from_function_result(s: String) -> Self {
        match s.parse::<f64>() {
            Ok(n) if n.is_finite() => FormulaValue::Number(n),
            _ => FormulaValue::String(s),
        }
    }
}

/// Context for evaluation
pub struct EvaluationContext<'a> {
    /// Functions callable from the expression
    pub functions: &'a FunctionRegistry,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }
}

/// Parse and evaluate a substituted expression
///
/// # Example
/// ```rust
/// use hoja_formula::{evaluate, FormulaValue, FunctionRegistry};
///
/// let registry = FunctionRegistry::new();
/// let value = evaluate("SUM(5,10)/3", &registry).unwrap();
/// assert_eq!(value, FormulaValue::Number(5.0));
/// ```
pub fn evaluate(expression: &str, functions: &FunctionRegistry) -> FormulaResult<FormulaValue> {
    let ast = parse_formula(expression)?;
    let value = evaluate_ast(&ast, &EvaluationContext::new(functions))?;
    // Reject non-finite results here so callers only see storable values
    value.to_display()?;
    Ok(value)
}

/// Evaluate a formula AST
pub fn evaluate_ast(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),

        // === Operators ===
        FormulaExpr::Chain { first, rest } => evaluate_chain(first, rest, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Evaluate an operator chain left to right
fn evaluate_chain(
    first: &FormulaExpr,
    rest: &[(BinaryOperator, FormulaExpr)],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let mut acc = evaluate_ast(first, ctx)?.to_number()?;

    for (op, operand) in rest {
        let r = evaluate_ast(operand, ctx)?.to_number()?;
        acc = match op {
            BinaryOperator::Add => acc + r,
            BinaryOperator::Subtract => acc - r,
            BinaryOperator::Multiply => acc * r,
            BinaryOperator::Divide => acc / r,
        };
    }
    Ok(FormulaValue::Number(acc))
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = evaluate_ast(operand, ctx)?.to_number()?;
    match op {
        UnaryOperator::Negate => Ok(FormulaValue::Number(-n)),
        UnaryOperator::Plus => Ok(FormulaValue::Number(n)),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[CallArg],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let args: Vec<String> = args
        .iter()
        .map(|arg| match arg {
            CallArg::Number(n) => format_number(*n),
            CallArg::String(s) => s.clone(),
        })
        .collect();

    let result = ctx.functions.call(name, &args)?;
    Ok(FormulaValue::from_function_result(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expression: &str) -> FormulaResult<FormulaValue> {
        evaluate(expression, &FunctionRegistry::new())
    }

    fn code(expression: &str) -> CellError {
        eval(expression).unwrap_err().code()
    }

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("42").unwrap(), FormulaValue::Number(42.0));
        assert_eq!(eval("3.14").unwrap(), FormulaValue::Number(3.14));
        assert_eq!(
            eval("\"Hello\"").unwrap(),
            FormulaValue::String("Hello".into())
        );
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("1+2").unwrap(), FormulaValue::Number(3.0));
        assert_eq!(eval("10-3").unwrap(), FormulaValue::Number(7.0));
        assert_eq!(eval("4*5").unwrap(), FormulaValue::Number(20.0));
        assert_eq!(eval("20/4").unwrap(), FormulaValue::Number(5.0));
        assert_eq!(eval("2+3*4").unwrap(), FormulaValue::Number(14.0));
        assert_eq!(eval("(2+3)*4").unwrap(), FormulaValue::Number(20.0));
        assert_eq!(eval("--3").unwrap(), FormulaValue::Number(3.0));
        assert_eq!(eval("-2*+3").unwrap(), FormulaValue::Number(-6.0));
    }

    #[test]
    fn test_text_operands() {
        assert_eq!(eval("\"5\"*2").unwrap(), FormulaValue::Number(10.0));
        assert_eq!(eval("\"\"+1").unwrap(), FormulaValue::Number(1.0));
        assert_eq!(code("\"abc\"+1"), CellError::Error);
        assert_eq!(code("\"#CIRCULAR_DEPENDENCY\"+1"), CellError::CircularDependency);
        assert_eq!(
            code("-\"#INVALID_FUNCTION_NAME (FOO)\""),
            CellError::InvalidFunctionName
        );
    }

    #[test]
    fn test_function_calls() {
        assert_eq!(eval("SUM(5,10)").unwrap(), FormulaValue::Number(15.0));
        assert_eq!(eval("sum(1,2)+1").unwrap(), FormulaValue::Number(4.0));
        assert_eq!(eval("AVERAGE(1,2)*2").unwrap(), FormulaValue::Number(3.0));
        assert_eq!(eval("COUNT(\"a\",\"\")").unwrap(), FormulaValue::Number(2.0));
        assert_eq!(code("SUM()"), CellError::ArgumentsMustBeProvided);
        assert_eq!(code("SUM(1,\"x\")"), CellError::ArgumentsMustBeNumbers);
        assert_eq!(code("NOPE(1)"), CellError::InvalidFunctionName);
    }

    #[test]
    fn test_long_sum() {
        let input = format!("{}1", "1+".repeat(50_000));
        assert_eq!(eval(&input).unwrap(), FormulaValue::Number(50_001.0));
        assert_eq!(eval("10-2-3").unwrap(), FormulaValue::Number(5.0));
        assert_eq!(eval("16/4/2").unwrap(), FormulaValue::Number(2.0));
    }

    #[test]
    fn test_non_finite_results() {
        assert_eq!(code("1/0"), CellError::InvalidResultType);
        assert_eq!(code("0/0"), CellError::InvalidResultType);
        assert_eq!(eval("1/(1/0)").unwrap(), FormulaValue::Number(0.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(FormulaValue::Number(2.5).to_display().unwrap(), "2.5");
        assert_eq!(FormulaValue::Number(15.0).to_display().unwrap(), "15");
        assert_eq!(
            FormulaValue::String("x".into()).to_display().unwrap(),
            "x"
        );
    }
}
