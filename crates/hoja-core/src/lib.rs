//! # hoja-core
//!
//! Core data structures for the hoja formula engine.
//!
//! This crate provides the fundamental types used throughout hoja:
//! - [`Coord`] and [`CellRange`] - Cell addressing and the `A1` id codec
//! - [`Cell`] - A stored cell (raw value + computed value)
//! - [`CellError`] - The formula error codes
//! - [`Sheet`] - The sparse grid store
//! - [`SheetDocument`] - The persisted document (sheet + row/column styles)
//!
//! ## Example
//!
//! ```rust
//! use hoja_core::{Cell, Coord, Sheet};
//!
//! let mut sheet = Sheet::new(10, 10);
//! let a1 = Coord::from_id("A1").unwrap();
//!
//! sheet.set(Cell::new(a1, "42")).unwrap();
//! assert_eq!(sheet.get(a1).display_value(), "42");
//!
//! // Absent cells read back as empty
//! assert!(sheet.get(Coord::new(3, 3)).is_empty());
//! ```

pub mod cell;
pub mod document;
pub mod error;
pub mod sheet;
pub mod style;

// Re-exports for convenience
pub use cell::{
    column_to_letters, coord_to_id, id_to_coord, letters_to_column, Cell, CellError, CellRange,
    Coord,
};
pub use document::SheetDocument;
pub use error::{Error, Result};
pub use sheet::{cell_key, Sheet};
pub use style::CellStyle;

/// Number of rows in a new sheet
pub const DEFAULT_ROWS: u32 = 48;

/// Number of columns in a new sheet
pub const DEFAULT_COLS: u32 = 30;
