//! Cell-related types and utilities
//!
//! This module contains:
//! - [`Coord`] - A cell's location and its `A1` id codec
//! - [`CellRange`] - A rectangular range of cells (e.g., "A1:B10")
//! - [`Cell`] - The stored cell record (raw value + computed value)
//! - [`CellError`] - Formula error codes

mod address;
mod value;

pub use address::{
    column_to_letters, coord_to_id, id_to_coord, letters_to_column, CellRange,
    CellRangeIterator, Coord,
};
pub use value::{Cell, CellError};
