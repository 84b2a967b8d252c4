//! # hoja
//!
//! A spreadsheet formula engine.
//!
//! Hoja stores a sparse grid of text cells addressed by `A1`-style ids,
//! evaluates formulas such as `=SUM(A1:A3)/2` against it, and recomputes
//! the grid when cells change.
//!
//! ## Features
//!
//! - A1 references and rectangular ranges, substituted into formulas
//! - A whitelist validator with stable error codes (`#CIRCULAR_DEPENDENCY`, ...)
//! - SUM, AVERAGE, COUNT, MAX, MIN, SUBTRACT, MULTIPLY, with Spanish aliases
//! - Dependency-ordered recalculation with cycle detection
//! - JSON documents with row and column sizing
//!
//! ## Example
//!
//! ```rust
//! use hoja::prelude::*;
//!
//! let mut sheet = Sheet::new(10, 10);
//! sheet.update_cells(
//!     &[
//!         CellUpdate::parse("A1", "10").unwrap(),
//!         CellUpdate::parse("A2", "20").unwrap(),
//!         CellUpdate::parse("A3", "=AVERAGE(A1:A2)").unwrap(),
//!     ],
//!     true,
//! );
//! sheet.recompute();
//!
//! assert_eq!(get_cell(id_to_coord("A3").unwrap(), &sheet).display_value(), "15");
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{
    get_cell, recompute_sheet, update_cells, CalculationEngine, CalculationOptions,
    CalculationStats, CellUpdate, CycleDetection, RecomputeOrder, SheetCalculationExt,
};

// Re-export core types
pub use hoja_core::{
    cell_key, column_to_letters, coord_to_id, id_to_coord, letters_to_column, Cell, CellError,
    CellRange, CellStyle, Coord, Error, Result, Sheet, SheetDocument, DEFAULT_COLS, DEFAULT_ROWS,
};

// Re-export formula types
pub use hoja_formula::{
    evaluate, parse_expression, reference_at, referenced_cells, scan_references,
    validate_expression, DependencyGraph, FormulaError, FormulaResult, FormulaValue, FunctionDef,
    FunctionRegistry, ParsedExpression, Reference,
};

use std::path::Path;

/// Extension trait for SheetDocument to add file I/O
pub trait DocumentExt: Sized {
    /// Open a document from a JSON file
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;

    /// Save the document to a JSON file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl DocumentExt for SheetDocument {
    fn open<P: AsRef<Path>>(path: P) -> Result<SheetDocument> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::other(format!("{}: {}", path.display(), e)))?;
        SheetDocument::from_json(&json)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_pretty()?)
            .map_err(|e| Error::other(format!("{}: {}", path.display(), e)))
    }
}
