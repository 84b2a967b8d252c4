//! Cell record and error codes

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Coord;

/// A stored cell
///
/// `value` is the raw user input (formulas start with `=`). `computed_value`
/// holds the last evaluated display string of a formula, or its error code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub x: u32,
    pub y: u32,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed_value: Option<String>,
}

impl Cell {
    /// Create a cell holding raw input, not yet computed
    pub fn new<S: Into<String>>(coord: Coord, value: S) -> Self {
        Self {
            x: coord.x,
            y: coord.y,
            value: value.into(),
            computed_value: None,
        }
    }

    /// Synthesize an empty cell at a coordinate
    pub fn empty(coord: Coord) -> Self {
        Self::new(coord, "")
    }

    /// The cell's coordinate
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }

    /// Check if the cell is logically absent
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Check if the raw value is a formula
    pub fn is_formula(&self) -> bool {
        self.value.starts_with('=')
    }

    /// The text shown for this cell: computed value if any, raw value otherwise
    pub fn display_value(&self) -> &str {
        self.computed_value.as_deref().unwrap_or(&self.value)
    }

    /// The error code held by this cell, if its display value is one
    pub fn error(&self) -> Option<CellError> {
        CellError::from_display(self.display_value())
    }
}

/// Formula error codes written into `computed_value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// Nothing after the leading `=`
    EmptyExpression,
    /// Validator invoked on text that is not a formula
    MustStartWithEqual,
    /// Function name not in the whitelist
    InvalidFunctionName,
    /// A function argument is not an id, range, number or string
    InvalidArgumentsInFunction,
    /// A range used as an arithmetic operand
    RangeOutsideFunction,
    /// Dangling operator or unbalanced parentheses
    InvalidOperationFormat,
    /// Malformed cell id
    InvalidId,
    /// The formula references its own cell
    CircularDependency,
    /// Substituted expression does not have a well-formed call shape
    InvalidRange,
    /// Evaluation produced something that is not a finite number or a string
    InvalidResultType,
    /// Catch-all evaluation fault
    Error,
    /// A function was called without arguments
    ArgumentsMustBeProvided,
    /// A function argument is not numeric
    ArgumentsMustBeNumbers,
}

impl CellError {
    /// All error codes
    pub const ALL: [CellError; 13] = [
        CellError::EmptyExpression,
        CellError::MustStartWithEqual,
        CellError::InvalidFunctionName,
        CellError::InvalidArgumentsInFunction,
        CellError::RangeOutsideFunction,
        CellError::InvalidOperationFormat,
        CellError::InvalidId,
        CellError::CircularDependency,
        CellError::InvalidRange,
        CellError::InvalidResultType,
        CellError::Error,
        CellError::ArgumentsMustBeProvided,
        CellError::ArgumentsMustBeNumbers,
    ];

    /// Get the code string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::EmptyExpression => "#EMPTY_EXPRESSION",
            CellError::MustStartWithEqual => "#MUST_START_WITH_EQUAL",
            CellError::InvalidFunctionName => "#INVALID_FUNCTION_NAME",
            CellError::InvalidArgumentsInFunction => "#INVALID_ARGUMENTS_IN_FUNCTION",
            CellError::RangeOutsideFunction => "#RANGE_OUTSIDE_FUNCTION",
            CellError::InvalidOperationFormat => "#INVALID_OPERATION_FORMAT",
            CellError::InvalidId => "#INVALID_ID",
            CellError::CircularDependency => "#CIRCULAR_DEPENDENCY",
            CellError::InvalidRange => "#INVALID_RANGE",
            CellError::InvalidResultType => "#INVALID_RESULT_TYPE",
            CellError::Error => "#ERROR",
            CellError::ArgumentsMustBeProvided => "#ARGUMENTS_MUST_BE_PROVIDED",
            CellError::ArgumentsMustBeNumbers => "#ARGUMENTS_MUST_BE_NUMBERS",
        }
    }

    /// Parse an exact error code
    pub fn from_code(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    /// Recognize a display string that starts with an error code
    ///
    /// Display strings may carry detail after the code, as in
    /// `#INVALID_FUNCTION_NAME (FOO)`.
    pub fn from_display(s: &str) -> Option<Self> {
        if !s.starts_with('#') {
            return None;
        }
        let code = s.split(' ').next().unwrap_or(s);
        Self::from_code(code)
    }

    /// Check whether a display string is an error code
    pub fn is_error_text(s: &str) -> bool {
        Self::from_display(s).is_some()
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_codes_round_trip() {
        for err in CellError::ALL {
            assert_eq!(CellError::from_code(err.as_str()), Some(err));
        }
        assert_eq!(CellError::from_code("#VALUE!"), None);
    }

    #[test]
    fn test_error_from_display() {
        assert_eq!(
            CellError::from_display("#INVALID_FUNCTION_NAME (FOO)"),
            Some(CellError::InvalidFunctionName)
        );
        assert_eq!(
            CellError::from_display("#CIRCULAR_DEPENDENCY"),
            Some(CellError::CircularDependency)
        );
        assert!(!CellError::is_error_text("#hashtag"));
        assert!(!CellError::is_error_text("ERROR"));
    }

    #[test]
    fn test_display_value() {
        let mut cell = Cell::new(Coord::new(0, 0), "=SUM(1,2)");
        assert!(cell.is_formula());
        assert_eq!(cell.display_value(), "=SUM(1,2)");

        cell.computed_value = Some("3".into());
        assert_eq!(cell.display_value(), "3");

        let plain = Cell::new(Coord::new(1, 0), "hello");
        assert!(!plain.is_formula());
        assert_eq!(plain.display_value(), "hello");
        assert_eq!(plain.error(), None);
    }

    #[test]
    fn test_cell_json_shape() {
        let cell = Cell::new(Coord::new(2, 0), "5");
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"x":2,"y":0,"value":"5"}"#);

        let cell: Cell =
            serde_json::from_str(r#"{"x":0,"y":1,"value":"=A1","computedValue":"5"}"#).unwrap();
        assert_eq!(cell.computed_value.as_deref(), Some("5"));
        assert_eq!(cell.coord(), Coord::new(0, 1));
    }
}
