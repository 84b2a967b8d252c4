//! Row and column sizing styles
//!
//! Styles are persisted alongside the sheet but never read by the formula
//! engine. Column styles are keyed by column letters, row styles by row number.

use serde::{Deserialize, Serialize};

/// Default row height in pixels
pub const ROW_DEFAULT_HEIGHT: f64 = 28.0;
/// Minimum row height in pixels
pub const ROW_MIN_HEIGHT: f64 = 20.0;
/// Default column width in pixels
pub const COLUMN_DEFAULT_WIDTH: f64 = 160.0;
/// Minimum column width in pixels
pub const COLUMN_MIN_WIDTH: f64 = 50.0;

/// Size overrides for a row or a column
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CellStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl CellStyle {
    /// Create an empty style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width
    pub fn width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Set the height
    pub fn height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Overlay `other` on top of this style
    ///
    /// Fields set in `other` win; fields it leaves unset keep their value.
    pub fn merge(&self, other: &CellStyle) -> CellStyle {
        CellStyle {
            width: other.width.or(self.width),
            height: other.height.or(self.height),
        }
    }

    /// Effective column width, clamped to the minimum
    pub fn column_width(&self) -> f64 {
        self.width.unwrap_or(COLUMN_DEFAULT_WIDTH).max(COLUMN_MIN_WIDTH)
    }

    /// Effective row height, clamped to the minimum
    pub fn row_height(&self) -> f64 {
        self.height.unwrap_or(ROW_DEFAULT_HEIGHT).max(ROW_MIN_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = CellStyle::new().width(200.0).height(30.0);
        let merged = base.merge(&CellStyle::new().height(40.0));
        assert_eq!(merged, CellStyle::new().width(200.0).height(40.0));
    }

    #[test]
    fn test_effective_sizes() {
        assert_eq!(CellStyle::new().column_width(), COLUMN_DEFAULT_WIDTH);
        assert_eq!(CellStyle::new().width(10.0).column_width(), COLUMN_MIN_WIDTH);
        assert_eq!(CellStyle::new().row_height(), ROW_DEFAULT_HEIGHT);
        assert_eq!(CellStyle::new().height(5.0).row_height(), ROW_MIN_HEIGHT);
    }
}
