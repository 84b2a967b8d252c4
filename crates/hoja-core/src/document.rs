//! Sheet document - the persisted structure
//!
//! A document bundles a named [`Sheet`] with row and column sizing. It is
//! exported and imported as JSON in the layout
//! `{ name, sheet: { cells, rows, cols }, columnsStyles, rowsStyles }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sheet::Sheet;
use crate::style::CellStyle;
use crate::{DEFAULT_COLS, DEFAULT_ROWS};

/// Default name given to new documents
pub const DEFAULT_SHEET_NAME: &str = "New sheet";

/// A named sheet plus its persisted row/column styles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDocument {
    /// Document name
    pub name: String,
    /// The grid
    pub sheet: Sheet,
    /// Column styles keyed by column letters
    #[serde(default)]
    pub columns_styles: BTreeMap<String, CellStyle>,
    /// Row styles keyed by row number
    #[serde(default)]
    pub rows_styles: BTreeMap<String, CellStyle>,
}

impl SheetDocument {
    /// Create an empty document with the default size
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_size(name, DEFAULT_ROWS, DEFAULT_COLS)
    }

    /// Create an empty document with the given size
    pub fn with_size<S: Into<String>>(name: S, rows: u32, cols: u32) -> Self {
        Self {
            name: name.into(),
            sheet: Sheet::new(rows, cols),
            columns_styles: BTreeMap::new(),
            rows_styles: BTreeMap::new(),
        }
    }

    /// Rename the document
    pub fn rename<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    /// Merge a style into a column's style
    pub fn set_column_style(&mut self, column: &str, style: CellStyle) {
        let entry = self.columns_styles.entry(column.to_string()).or_default();
        *entry = entry.merge(&style);
    }

    /// Merge a style into a row's style
    pub fn set_row_style(&mut self, row: &str, style: CellStyle) {
        let entry = self.rows_styles.entry(row.to_string()).or_default();
        *entry = entry.merge(&style);
    }

    /// Style of a column, default if none was set
    pub fn column_style(&self, column: &str) -> CellStyle {
        self.columns_styles.get(column).copied().unwrap_or_default()
    }

    /// Style of a row, default if none was set
    pub fn row_style(&self, row: &str) -> CellStyle {
        self.rows_styles.get(row).copied().unwrap_or_default()
    }

    /// Export as a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Export as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Import from a JSON string
    ///
    /// The imported grid must satisfy the sheet invariants.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SheetDocument = serde_json::from_str(json)?;
        if let Err(e) = document.sheet.validate() {
            tracing::warn!("rejecting imported document '{}': {}", document.name, e);
            return Err(e);
        }
        Ok(document)
    }
}

impl Default for SheetDocument {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_NAME)
    }
}

impl std::str::FromStr for SheetDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}
