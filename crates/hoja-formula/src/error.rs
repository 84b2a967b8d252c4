//! Formula error types

use hoja_core::{CellError, Coord};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula validation or evaluation
///
/// Every variant maps onto one [`CellError`] code; the payloads only carry
/// context for logs and messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Nothing after the leading `=`
    #[error("Empty expression")]
    EmptyExpression,

    /// The text is not a formula
    #[error("Formula must start with '='")]
    MustStartWithEqual,

    /// Unknown function
    #[error("Unknown function: {0}")]
    InvalidFunctionName(String),

    /// A call argument is not an id, range, number or string
    #[error("Invalid argument '{argument}' in {function}")]
    InvalidArguments { function: String, argument: String },

    /// A range used outside a function call
    #[error("Range {0} used outside a function")]
    RangeOutsideFunction(String),

    /// Dangling operator, unbalanced parentheses
    #[error("Invalid operation format: {0}")]
    InvalidOperationFormat(String),

    /// Malformed cell id
    #[error("Invalid cell id: {0}")]
    InvalidId(String),

    /// The formula references its own cell, directly or through other cells
    #[error("Circular dependency at {0}")]
    CircularDependency(Coord),

    /// The substituted expression does not have a well-formed call shape
    #[error("Invalid range or call shape: {0}")]
    InvalidRange(String),

    /// The result is not a finite number or a string
    #[error("Invalid result type: {0}")]
    InvalidResultType(String),

    /// The substituted expression does not parse
    #[error("Parse error: {0}")]
    Parse(String),

    /// Catch-all evaluation fault
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Function called without arguments
    #[error("{0} requires at least one argument")]
    ArgumentsMustBeProvided(String),

    /// Non-numeric function argument
    #[error("Argument '{argument}' of {function} is not a number")]
    ArgumentsMustBeNumbers { function: String, argument: String },

    /// An error code carried in from a referenced cell
    #[error("Propagated {0}")]
    Propagated(CellError),
}

impl FormulaError {
    /// The cell error code for this error
    pub fn code(&self) -> CellError {
        match self {
            FormulaError::EmptyExpression => CellError::EmptyExpression,
            FormulaError::MustStartWithEqual => CellError::MustStartWithEqual,
            FormulaError::InvalidFunctionName(_) => CellError::InvalidFunctionName,
            FormulaError::InvalidArguments { .. } => CellError::InvalidArgumentsInFunction,
            FormulaError::RangeOutsideFunction(_) => CellError::RangeOutsideFunction,
            FormulaError::InvalidOperationFormat(_) => CellError::InvalidOperationFormat,
            FormulaError::InvalidId(_) => CellError::InvalidId,
            FormulaError::CircularDependency(_) => CellError::CircularDependency,
            FormulaError::InvalidRange(_) => CellError::InvalidRange,
            FormulaError::InvalidResultType(_) => CellError::InvalidResultType,
            FormulaError::Parse(_) | FormulaError::Evaluation(_) => CellError::Error,
            FormulaError::ArgumentsMustBeProvided(_) => CellError::ArgumentsMustBeProvided,
            FormulaError::ArgumentsMustBeNumbers { .. } => CellError::ArgumentsMustBeNumbers,
            FormulaError::Propagated(code) => *code,
        }
    }

    /// The string written into a cell's computed value
    ///
    /// Unknown function names keep the offending name: `#INVALID_FUNCTION_NAME (FOO)`.
    pub fn to_display(&self) -> String {
        match self {
            FormulaError::InvalidFunctionName(name) => {
                format!("{} ({})", self.code(), name)
            }
            _ => self.code().to_string(),
        }
    }
}

impl From<hoja_core::Error> for FormulaError {
    fn from(e: hoja_core::Error) -> Self {
        match e {
            hoja_core::Error::InvalidId(id) => FormulaError::InvalidId(id),
            hoja_core::Error::InvalidRange(range) => FormulaError::InvalidRange(range),
            other => FormulaError::Evaluation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings() {
        assert_eq!(
            FormulaError::InvalidFunctionName("FOO".into()).to_display(),
            "#INVALID_FUNCTION_NAME (FOO)"
        );
        assert_eq!(
            FormulaError::CircularDependency(Coord::new(0, 0)).to_display(),
            "#CIRCULAR_DEPENDENCY"
        );
        assert_eq!(
            FormulaError::Evaluation("boom".into()).to_display(),
            "#ERROR"
        );
        assert_eq!(
            FormulaError::Propagated(CellError::InvalidRange).to_display(),
            "#INVALID_RANGE"
        );
    }

    #[test]
    fn test_from_core_error() {
        let err: FormulaError = hoja_core::Coord::from_id("A0").unwrap_err().into();
        assert_eq!(err.code(), CellError::InvalidId);
    }
}
