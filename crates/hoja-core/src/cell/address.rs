//! Cell coordinates, ids and ranges

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A zero-based cell coordinate
///
/// `x` is the column (A=0, B=1, ..., Z=25, AA=26) and `y` is the row
/// (row "1" in an id is `y = 0`). Ordering is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    /// Column index (0-based)
    pub x: u32,
    /// Row index (0-based internally, 1-based in ids)
    pub y: u32,
}

impl Coord {
    /// Create a new coordinate
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Parse a cell id such as `A1` or `BA12`
    ///
    /// Only uppercase column letters are accepted and the row number must be
    /// greater than zero.
    ///
    /// # Examples
    /// ```
    /// use hoja_core::Coord;
    ///
    /// let coord = Coord::from_id("AA1").unwrap();
    /// assert_eq!(coord, Coord::new(26, 0));
    /// assert!(Coord::from_id("A0").is_err());
    /// assert!(Coord::from_id("a1").is_err());
    /// ```
    pub fn from_id(id: &str) -> Result<Self> {
        let bytes = id.as_bytes();
        let letters_end = bytes
            .iter()
            .position(|b| !b.is_ascii_uppercase())
            .unwrap_or(bytes.len());

        if letters_end == 0 {
            return Err(Error::InvalidId(format!("no column letters in '{}'", id)));
        }

        let row_str = &id[letters_end..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidId(format!("invalid row number in '{}'", id)));
        }

        let x = letters_to_column(&id[..letters_end])?;

        let row: u64 = row_str
            .parse()
            .map_err(|_| Error::InvalidId(format!("row number too large in '{}'", id)))?;
        if row == 0 {
            return Err(Error::InvalidId(format!(
                "row number must be >= 1 in '{}'",
                id
            )));
        }
        let y = u32::try_from(row - 1)
            .map_err(|_| Error::InvalidId(format!("row number too large in '{}'", id)))?;

        Ok(Self { x, y })
    }

    /// Format as an id (`A1`, `AA1`, ...)
    pub fn to_id(&self) -> String {
        let mut id = column_to_letters(self.x);
        id.push_str(&(self.y as u64 + 1).to_string());
        id
    }

    /// Whether this coordinate lies inside a `cols` x `rows` grid
    pub fn in_bounds(&self, rows: u32, cols: u32) -> bool {
        self.x < cols && self.y < rows
    }

    /// Create a range from this coordinate to another
    pub fn to(&self, other: Coord) -> CellRange {
        CellRange::new(*self, other)
    }
}

impl PartialOrd for Coord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_id())
    }
}

impl FromStr for Coord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_id(s)
    }
}

/// `coordToId`: convert a coordinate to its textual id
pub fn coord_to_id(coord: Coord) -> String {
    coord.to_id()
}

/// `idToCoord`: parse a textual id into a coordinate
pub fn id_to_coord(id: &str) -> Result<Coord> {
    Coord::from_id(id)
}

/// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
pub fn column_to_letters(col: u32) -> String {
    let mut result = String::new();
    let mut n = col as u64 + 1; // bijective base-26

    while n > 0 {
        n -= 1;
        let c = ((n % 26) as u8 + b'A') as char;
        result.insert(0, c);
        n /= 26;
    }

    result
}

/// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
pub fn letters_to_column(letters: &str) -> Result<u32> {
    if letters.is_empty() {
        return Err(Error::InvalidId("empty column letters".into()));
    }

    let mut col: u64 = 0;
    for c in letters.bytes() {
        if !c.is_ascii_uppercase() {
            return Err(Error::InvalidId(format!(
                "invalid column letter '{}'",
                c as char
            )));
        }
        col = col * 26 + (c - b'A') as u64 + 1;
        if col > u32::MAX as u64 + 1 {
            return Err(Error::InvalidId(format!("column '{}' too large", letters)));
        }
    }

    Ok((col - 1) as u32)
}

/// A rectangular range of cells (e.g., "A1:B10")
///
/// Corners are normalized so `start` is the top-left and `end` the
/// bottom-right cell, whatever order they were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: Coord,
    /// Bottom-right corner
    pub end: Coord,
}

impl CellRange {
    /// Create a new, normalized range
    pub fn new(a: Coord, b: Coord) -> Self {
        Self {
            start: Coord::new(a.x.min(b.x), a.y.min(b.y)),
            end: Coord::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Create a single-cell range
    pub fn single(coord: Coord) -> Self {
        Self {
            start: coord,
            end: coord,
        }
    }

    /// Parse a range from `A1:B10` notation (a bare id is a single-cell range)
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((start, end)) => {
                let start = Coord::from_id(start)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                let end = Coord::from_id(end)
                    .map_err(|e| Error::InvalidRange(format!("'{}': {}", s, e)))?;
                Ok(Self::new(start, end))
            }
            None => Ok(Self::single(Coord::from_id(s)?)),
        }
    }

    /// Check if a cell is within this range
    pub fn contains(&self, coord: &Coord) -> bool {
        coord.x >= self.start.x
            && coord.x <= self.end.x
            && coord.y >= self.start.y
            && coord.y <= self.end.y
    }

    /// Number of columns in the range
    pub fn width(&self) -> u64 {
        (self.end.x - self.start.x) as u64 + 1
    }

    /// Number of rows in the range
    pub fn height(&self) -> u64 {
        (self.end.y - self.start.y) as u64 + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.width() * self.height()
    }

    /// Iterate over all coordinates in the range (row by row)
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            next: Some(self.start),
        }
    }

    /// Format as `A1:B10` (or `A1` for a single cell)
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_id()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over cells in a range, row-major
pub struct CellRangeIterator {
    range: CellRange,
    next: Option<Coord>,
}

impl Iterator for CellRangeIterator {
    type Item = Coord;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        self.next = if current.x < self.range.end.x {
            Some(Coord::new(current.x + 1, current.y))
        } else if current.y < self.range.end.y {
            Some(Coord::new(self.range.start.x, current.y + 1))
        } else {
            None
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_column_to_letters() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(1), "B");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(27), "AB");
        assert_eq!(column_to_letters(52), "BA");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
    }

    #[test]
    fn test_letters_to_column() {
        assert_eq!(letters_to_column("A").unwrap(), 0);
        assert_eq!(letters_to_column("Z").unwrap(), 25);
        assert_eq!(letters_to_column("AA").unwrap(), 26);
        assert_eq!(letters_to_column("BA").unwrap(), 52);
        assert_eq!(letters_to_column("ZZ").unwrap(), 701);
        assert_eq!(letters_to_column("AAA").unwrap(), 702);

        assert!(letters_to_column("").is_err());
        assert!(letters_to_column("a").is_err());
        assert!(letters_to_column(&"Z".repeat(12)).is_err());
    }

    #[test]
    fn test_coord_from_id() {
        assert_eq!(Coord::from_id("A1").unwrap(), Coord::new(0, 0));
        assert_eq!(Coord::from_id("B2").unwrap(), Coord::new(1, 1));
        assert_eq!(Coord::from_id("AA1").unwrap(), Coord::new(26, 0));
        assert_eq!(Coord::from_id("BA12").unwrap(), Coord::new(52, 11));
    }

    #[test]
    fn test_coord_from_id_errors() {
        for bad in ["", "A", "1", "A0", "1A", "A 1", "a1", "A1B", "A-1", "$A$1"] {
            let err = Coord::from_id(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidId(_)), "{bad:?} gave {err:?}");
        }
        assert!(Coord::from_id("A99999999999").is_err());
    }

    #[test]
    fn test_coord_to_id() {
        assert_eq!(Coord::new(0, 0).to_id(), "A1");
        assert_eq!(Coord::new(26, 0).to_id(), "AA1");
        assert_eq!(Coord::new(2, 99).to_string(), "C100");
        assert_eq!(coord_to_id(Coord::new(52, 11)), "BA12");
        assert_eq!(id_to_coord("BA12").unwrap(), Coord::new(52, 11));
    }

    #[test]
    fn test_coord_ordering_is_row_major() {
        let mut coords = vec![Coord::new(1, 0), Coord::new(0, 1), Coord::new(0, 0)];
        coords.sort();
        assert_eq!(
            coords,
            vec![Coord::new(0, 0), Coord::new(1, 0), Coord::new(0, 1)]
        );
    }

    #[test]
    fn test_cell_range_parse_normalizes() {
        let range = CellRange::parse("B3:A1").unwrap();
        assert_eq!(range.start, Coord::new(0, 0));
        assert_eq!(range.end, Coord::new(1, 2));
        assert_eq!(range.to_string(), "A1:B3");

        let range = CellRange::parse("C3").unwrap();
        assert_eq!(range.start, range.end);
        assert_eq!(range.cell_count(), 1);

        assert!(matches!(
            CellRange::parse("A1:B"),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_cell_range_iterator() {
        let range = CellRange::parse("A1:B2").unwrap();
        let cells: Vec<_> = range.cells().collect();

        assert_eq!(
            cells,
            vec![
                Coord::new(0, 0), // A1
                Coord::new(1, 0), // B1
                Coord::new(0, 1), // A2
                Coord::new(1, 1), // B2
            ]
        );
    }

    #[test]
    fn test_cell_range_contains() {
        let range = CellRange::parse("B2:D4").unwrap();

        assert!(range.contains(&Coord::new(1, 1)));
        assert!(range.contains(&Coord::new(3, 3)));
        assert!(!range.contains(&Coord::new(0, 0)));
        assert!(!range.contains(&Coord::new(1, 4)));
    }

    proptest! {
        #[test]
        fn prop_coord_round_trip(x in 0u32..(26 * 27), y in 0u32..(26 * 27)) {
            let coord = Coord::new(x, y);
            prop_assert_eq!(Coord::from_id(&coord.to_id()).unwrap(), coord);
        }

        #[test]
        fn prop_id_round_trip(letters in "[A-Z]{1,3}", row in 1u32..100_000) {
            let id = format!("{}{}", letters, row);
            prop_assert_eq!(Coord::from_id(&id).unwrap().to_id(), id);
        }
    }
}
