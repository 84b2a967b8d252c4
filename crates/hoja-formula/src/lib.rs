//! # hoja-formula
//!
//! Formula machinery for hoja.
//!
//! This crate provides:
//! - Reference scanning and substitution ([`parse_expression`])
//! - The whitelist validator ([`validate_expression`])
//! - Built-in functions, English and Spanish names ([`FunctionRegistry`])
//! - Expression parsing and evaluation (substituted text → value)
//! - Dependency tracking for recalculation order and cycle detection
//!
//! ## Example
//!
//! ```rust
//! use hoja_core::{Cell, Coord, Sheet};
//! use hoja_formula::{evaluate, parse_expression, validate_expression, FunctionRegistry};
//!
//! let mut sheet = Sheet::new(10, 10);
//! sheet.set(Cell::new(Coord::new(0, 0), "5")).unwrap();
//! sheet.set(Cell::new(Coord::new(1, 0), "10")).unwrap();
//!
//! let formula = "=SUM(A1,B1)";
//! validate_expression(formula).unwrap();
//! let parsed = parse_expression(formula, &sheet);
//! let value = evaluate(&parsed.expression, &FunctionRegistry::new()).unwrap();
//! assert_eq!(value.to_display().unwrap(), "15");
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod number;
pub mod parser;
pub mod validator;

pub use ast::{BinaryOperator, CallArg, FormulaExpr, UnaryOperator};
pub use dependency::{reaches, DependencyGraph, EvaluationPlan};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, evaluate_ast, EvaluationContext, FormulaValue};
pub use expression::{
    parse_expression, reference_at, referenced_cells, scan_references, ParsedExpression,
    Reference, MAX_RANGE_CELLS,
};
pub use functions::{FunctionDef, FunctionImpl, FunctionRegistry};
pub use number::{coerce_number, format_number, is_number_literal};
pub use parser::{check_call_shape, parse_formula};
pub use validator::{validate_expression, validate_expression_with};
