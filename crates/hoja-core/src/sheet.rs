//! Sheet type - the sparse grid store

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Coord};
use crate::error::{Error, Result};

/// Storage key of a cell in the persisted layout (`"x,y"`)
pub fn cell_key(coord: Coord) -> String {
    format!("{},{}", coord.x, coord.y)
}

/// Parse a `"x,y"` storage key
pub fn parse_cell_key(key: &str) -> Option<Coord> {
    let (x, y) = key.split_once(',')?;
    Some(Coord::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// A sheet: sparse cells plus the grid dimensions
///
/// Coordinates not present in `cells` are implicitly empty. Every stored cell
/// is non-empty and lies within `[0, cols) x [0, rows)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    #[serde(with = "cell_map")]
    cells: BTreeMap<Coord, Cell>,
    rows: u32,
    cols: u32,
}

impl Sheet {
    /// Create an empty sheet with the given dimensions
    pub fn new(rows: u32, cols: u32) -> Self {
        Self {
            cells: BTreeMap::new(),
            rows,
            cols,
        }
    }

    /// Number of rows
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Check if a coordinate is within the sheet bounds
    pub fn contains(&self, coord: Coord) -> bool {
        coord.in_bounds(self.rows, self.cols)
    }

    /// Get a cell, or a synthesized empty cell if absent or out of bounds
    pub fn get(&self, coord: Coord) -> Cell {
        self.get_ref(coord)
            .cloned()
            .unwrap_or_else(|| Cell::empty(coord))
    }

    /// Borrow a stored cell
    pub fn get_ref(&self, coord: Coord) -> Option<&Cell> {
        if !self.contains(coord) {
            return None;
        }
        self.cells.get(&coord)
    }

    /// Store a cell at its own coordinate
    ///
    /// A cell with an empty value is removed instead of stored.
    pub fn set(&mut self, cell: Cell) -> Result<()> {
        let coord = cell.coord();
        if !self.contains(coord) {
            return Err(Error::OutOfBounds {
                x: coord.x,
                y: coord.y,
                cols: self.cols,
                rows: self.rows,
            });
        }

        if cell.is_empty() {
            self.cells.remove(&coord);
        } else {
            self.cells.insert(coord, cell);
        }
        Ok(())
    }

    /// Remove a cell, returning it if it was stored
    pub fn delete(&mut self, coord: Coord) -> Option<Cell> {
        self.cells.remove(&coord)
    }

    /// Change the dimensions, dropping cells that fall outside them
    pub fn resize(&mut self, rows: u32, cols: u32) {
        self.rows = rows;
        self.cols = cols;
        self.cells.retain(|coord, _| coord.in_bounds(rows, cols));
    }

    /// Number of stored cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cell is stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    /// Coordinates of the stored cells, row-major
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells.keys().copied()
    }

    /// Iterate over cells whose value is a formula
    pub fn formula_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().filter(|cell| cell.is_formula())
    }

    /// Replace the whole cell map, keeping dimensions
    ///
    /// Empty and out-of-bounds cells in `cells` are dropped.
    pub fn with_cells<I: IntoIterator<Item = Cell>>(&self, cells: I) -> Sheet {
        let mut sheet = Sheet::new(self.rows, self.cols);
        for cell in cells {
            if !cell.is_empty() && self.contains(cell.coord()) {
                sheet.cells.insert(cell.coord(), cell);
            }
        }
        sheet
    }

    /// Check the storage invariants
    pub fn validate(&self) -> Result<()> {
        for (coord, cell) in &self.cells {
            if cell.coord() != *coord {
                return Err(Error::InvalidDocument(format!(
                    "cell {} stored under key {}",
                    cell.coord(),
                    cell_key(*coord)
                )));
            }
            if !self.contains(*coord) {
                return Err(Error::InvalidDocument(format!(
                    "cell {} outside {} cols x {} rows",
                    coord, self.cols, self.rows
                )));
            }
            if cell.is_empty() {
                return Err(Error::InvalidDocument(format!("empty cell {} stored", coord)));
            }
        }
        Ok(())
    }
}

/// Serializes the cell map with `"x,y"` string keys
mod cell_map {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{cell_key, parse_cell_key};
    use crate::cell::{Cell, Coord};

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<Coord, Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let keyed: BTreeMap<String, &Cell> = cells
            .iter()
            .map(|(coord, cell)| (cell_key(*coord), cell))
            .collect();
        keyed.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Coord, Cell>, D::Error> {
        let keyed = BTreeMap::<String, Cell>::deserialize(deserializer)?;
        let mut cells = BTreeMap::new();
        for (key, cell) in keyed {
            let coord = parse_cell_key(&key)
                .ok_or_else(|| D::Error::custom(format!("invalid cell key '{}'", key)))?;
            if coord != cell.coord() {
                return Err(D::Error::custom(format!(
                    "cell key '{}' does not match cell ({}, {})",
                    key, cell.x, cell.y
                )));
            }
            cells.insert(coord, cell);
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coord(id: &str) -> Coord {
        Coord::from_id(id).unwrap()
    }

    #[test]
    fn test_get_missing_cell_is_empty() {
        let sheet = Sheet::new(10, 10);
        let cell = sheet.get(coord("C3"));
        assert_eq!(cell, Cell::empty(coord("C3")));

        // Out of bounds reads never fail
        let far = sheet.get(coord("ZZ999"));
        assert!(far.is_empty());
        assert_eq!(far.coord(), coord("ZZ999"));
    }

    #[test]
    fn test_set_and_delete() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set(Cell::new(coord("A1"), "5")).unwrap();
        assert_eq!(sheet.get(coord("A1")).value, "5");
        assert_eq!(sheet.len(), 1);

        // Setting an empty value deletes
        sheet.set(Cell::new(coord("A1"), "")).unwrap();
        assert!(sheet.is_empty());

        sheet.set(Cell::new(coord("B2"), "x")).unwrap();
        assert!(sheet.delete(coord("B2")).is_some());
        assert!(sheet.delete(coord("B2")).is_none());
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut sheet = Sheet::new(2, 2);
        let err = sheet.set(Cell::new(coord("C1"), "x")).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { x: 2, y: 0, .. }));
    }

    #[test]
    fn test_resize_prunes_out_of_bounds() {
        let mut sheet = Sheet::new(10, 10);
        sheet.set(Cell::new(coord("A1"), "keep")).unwrap();
        sheet.set(Cell::new(coord("E1"), "drop col")).unwrap();
        sheet.set(Cell::new(coord("A6"), "drop row")).unwrap();

        sheet.resize(5, 3);

        assert_eq!(sheet.rows(), 5);
        assert_eq!(sheet.cols(), 3);
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.get(coord("A1")).value, "keep");
    }

    #[test]
    fn test_iteration_is_row_major() {
        let mut sheet = Sheet::new(10, 10);
        for id in ["B2", "A2", "C1"] {
            sheet.set(Cell::new(coord(id), id)).unwrap();
        }
        let ids: Vec<String> = sheet.coords().map(|c| c.to_id()).collect();
        assert_eq!(ids, vec!["C1", "A2", "B2"]);
    }

    #[test]
    fn test_json_uses_cell_keys() {
        let mut sheet = Sheet::new(3, 4);
        sheet.set(Cell::new(coord("B1"), "5")).unwrap();

        let json = serde_json::to_value(&sheet).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "cells": { "1,0": { "x": 1, "y": 0, "value": "5" } },
                "rows": 3,
                "cols": 4
            })
        );

        let back: Sheet = serde_json::from_value(json).unwrap();
        assert_eq!(back, sheet);
    }

    #[test]
    fn test_json_rejects_mismatched_key() {
        let json = r#"{"cells":{"0,0":{"x":1,"y":0,"value":"5"}},"rows":3,"cols":3}"#;
        assert!(serde_json::from_str::<Sheet>(json).is_err());
    }

    #[test]
    fn test_validate() {
        let json = r#"{"cells":{"5,0":{"x":5,"y":0,"value":"5"}},"rows":3,"cols":3}"#;
        let sheet: Sheet = serde_json::from_str(json).unwrap();
        assert!(matches!(sheet.validate(), Err(Error::InvalidDocument(_))));

        let json = r#"{"cells":{"0,0":{"x":0,"y":0,"value":""}},"rows":3,"cols":3}"#;
        let sheet: Sheet = serde_json::from_str(json).unwrap();
        assert!(sheet.validate().is_err());
    }
}
