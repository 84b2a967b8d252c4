//! Error types for hoja-core

use thiserror::Error;

use crate::cell::CellError;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hoja-core
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed cell id (must look like `A1`, `BA12`)
    #[error("Invalid cell id: {0}")]
    InvalidId(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Coordinate outside the sheet bounds
    #[error("Cell ({x}, {y}) out of bounds ({cols} cols x {rows} rows)")]
    OutOfBounds { x: u32, y: u32, cols: u32, rows: u32 },

    /// A persisted document violates the sheet invariants
    #[error("Invalid sheet document: {0}")]
    InvalidDocument(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// The cell error code this error surfaces as when it reaches a cell
    pub fn cell_error(&self) -> CellError {
        match self {
            Error::InvalidId(_) => CellError::InvalidId,
            Error::InvalidRange(_) => CellError::InvalidRange,
            _ => CellError::Error,
        }
    }
}
