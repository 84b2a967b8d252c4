//! Sheet calculation engine
//!
//! Computes single cells, applies edits, and recomputes whole sheets with
//! circular reference detection.
//!
//! # Example
//!
//! ```rust
//! use hoja::prelude::*;
//!
//! let mut sheet = Sheet::new(10, 10);
//! sheet.update_cells(
//!     &[
//!         CellUpdate::parse("A1", "5").unwrap(),
//!         CellUpdate::parse("B1", "10").unwrap(),
//!         CellUpdate::parse("C1", "=SUM(A1,B1)").unwrap(),
//!     ],
//!     true,
//! );
//!
//! let stats = sheet.recompute();
//! assert_eq!(stats.formula_count, 1);
//! assert_eq!(sheet.get(Coord::from_id("C1").unwrap()).display_value(), "15");
//! ```

use std::collections::BTreeSet;

use hoja_core::{Cell, CellError, Coord, Result, Sheet};
use hoja_formula::{
    check_call_shape, evaluate, parse_expression, reaches, referenced_cells,
    validate_expression_with, DependencyGraph, FormulaError, FormulaResult, FunctionRegistry,
};

/// Which reference cycles are reported as `#CIRCULAR_DEPENDENCY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleDetection {
    /// Only formulas that read their own cell
    SelfReference,
    /// Every formula on a reference cycle of any length
    #[default]
    Full,
}

/// How a recompute sweep orders its cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecomputeOrder {
    /// Every cell reads the previous sweep's values
    Snapshot,
    /// Formulas run after the formulas they read, so one sweep is enough
    #[default]
    Dependency,
}

/// Options for sheet calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CalculationOptions {
    /// Cycle detection mode (default: full)
    pub cycles: CycleDetection,
    /// Recompute order (default: dependency order)
    pub order: RecomputeOrder,
}

impl CalculationOptions {
    /// Self-reference detection and snapshot sweeps
    ///
    /// Each sweep advances values by one generation, and a ring such as
    /// `A1 = B1`, `B1 = A1` is evaluated without a cycle error.
    pub fn reference() -> Self {
        Self {
            cycles: CycleDetection::SelfReference,
            order: RecomputeOrder::Snapshot,
        }
    }

    /// Set the cycle detection mode
    pub fn cycles(mut self, cycles: CycleDetection) -> Self {
        self.cycles = cycles;
        self
    }

    /// Set the recompute order
    pub fn order(mut self, order: RecomputeOrder) -> Self {
        self.order = order;
        self
    }
}

/// Statistics from a recompute sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells computed (plain cells included)
    pub cells_calculated: usize,
    /// Number of formulas reported as circular
    pub circular_references: usize,
    /// Number of formulas whose result is an error code
    pub errors: usize,
}

/// One edit: the new raw value of a cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub coord: Coord,
    pub new_value: String,
}

impl CellUpdate {
    /// Create an update
    pub fn new<S: Into<String>>(coord: Coord, new_value: S) -> Self {
        Self {
            coord,
            new_value: new_value.into(),
        }
    }

    /// Create an update from a cell id such as `B3`
    pub fn parse<S: Into<String>>(id: &str, new_value: S) -> Result<Self> {
        Ok(Self::new(Coord::from_id(id)?, new_value))
    }
}

/// The calculation engine
///
/// Owns the function table formulas are evaluated against.
#[derive(Clone)]
pub struct CalculationEngine {
    options: CalculationOptions,
    functions: FunctionRegistry,
}

impl Default for CalculationEngine {
    fn default() -> Self {
        Self::new(CalculationOptions::default())
    }
}

impl CalculationEngine {
    /// Create an engine with the built-in functions
    pub fn new(options: CalculationOptions) -> Self {
        Self::with_functions(options, FunctionRegistry::new())
    }

    /// Create an engine with a custom function table
    pub fn with_functions(options: CalculationOptions, functions: FunctionRegistry) -> Self {
        Self { options, functions }
    }

    /// The engine options
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// The function table
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Compute one cell against a sheet
    ///
    /// `new_value` replaces the cell's raw value when given. Plain values come
    /// back without a computed value; formulas always get one, an error code
    /// when anything fails.
    pub fn compute_cell(&self, cell: &Cell, sheet: &Sheet, new_value: Option<&str>) -> Cell {
        let coord = cell.coord();
        let value = new_value.unwrap_or(&cell.value);
        let on_cycle = match self.options.cycles {
            CycleDetection::SelfReference => false,
            CycleDetection::Full => {
                value.starts_with('=') && reaches(sheet, referenced_cells(value), coord)
            }
        };
        self.compute(coord, value, sheet, on_cycle)
    }

    /// Compute a raw value at `coord`
    ///
    /// `on_cycle` marks a formula already known to sit on a reference cycle.
    fn compute(&self, coord: Coord, value: &str, sheet: &Sheet, on_cycle: bool) -> Cell {
        let mut cell = Cell::new(coord, value);
        if !cell.is_formula() {
            return cell;
        }

        let computed = match self.evaluate_formula(coord, value, sheet, on_cycle) {
            Ok(result) => result,
            Err(e) => {
                tracing::trace!("{} {:?}: {}", coord, value, e);
                e.to_display()
            }
        };
        cell.computed_value = Some(computed);
        cell
    }

    fn evaluate_formula(
        &self,
        coord: Coord,
        value: &str,
        sheet: &Sheet,
        on_cycle: bool,
    ) -> FormulaResult<String> {
        validate_expression_with(value, &self.functions)?;

        let parsed = parse_expression(value, sheet);
        if on_cycle || parsed.touches(coord) {
            return Err(FormulaError::CircularDependency(coord));
        }

        check_call_shape(&parsed.expression)?;
        evaluate(&parsed.expression, &self.functions)?.to_display()
    }

    /// Apply edits to a sheet
    ///
    /// An empty `new_value` deletes the cell. With `recompute` each edited
    /// formula is evaluated against the sheet as it was before the edits;
    /// without it only the raw value is stored and any previous computed
    /// value is kept. Edits outside the grid are skipped.
    pub fn update_cells(&self, sheet: &Sheet, updates: &[CellUpdate], recompute: bool) -> Sheet {
        let mut next = sheet.clone();
        let mut edited = Vec::with_capacity(updates.len());

        for update in updates {
            if !sheet.contains(update.coord) {
                tracing::warn!(
                    "skipping update of {} outside {} cols x {} rows",
                    update.coord,
                    sheet.cols(),
                    sheet.rows()
                );
                continue;
            }

            if update.new_value.is_empty() {
                next.delete(update.coord);
                continue;
            }

            let mut cell = sheet.get(update.coord);
            cell.value = update.new_value.clone();
            store(&mut next, cell);
            edited.push(update);
        }

        if !recompute || edited.is_empty() {
            return next;
        }

        let circular = match self.options.cycles {
            CycleDetection::SelfReference => BTreeSet::new(),
            CycleDetection::Full => DependencyGraph::from_sheet(&next).circular_cells(),
        };

        for update in edited {
            // A later update in the same batch wins
            if next.get_ref(update.coord).map(|cell| &cell.value) != Some(&update.new_value) {
                continue;
            }
            let cell = self.compute(
                update.coord,
                &update.new_value,
                sheet,
                circular.contains(&update.coord),
            );
            store(&mut next, cell);
        }

        tracing::debug!("updated {} cells", updates.len());
        next
    }

    /// Recompute every stored cell
    pub fn recompute_sheet(&self, sheet: &Sheet) -> Sheet {
        self.recompute_sheet_with_stats(sheet).0
    }

    /// Recompute every stored cell, with statistics
    pub fn recompute_sheet_with_stats(&self, sheet: &Sheet) -> (Sheet, CalculationStats) {
        let graph = DependencyGraph::from_sheet(sheet);
        let plan = graph.plan();
        let circular = match self.options.cycles {
            CycleDetection::SelfReference => BTreeSet::new(),
            CycleDetection::Full => plan.circular,
        };

        let next = match self.options.order {
            RecomputeOrder::Snapshot => self.recompute_snapshot(sheet, &circular),
            RecomputeOrder::Dependency => self.recompute_ordered(sheet, plan.order, &circular),
        };

        let mut stats = CalculationStats {
            formula_count: graph.formula_count(),
            cells_calculated: sheet.len(),
            ..Default::default()
        };
        for cell in next.formula_cells() {
            let Some(error) = cell.error() else {
                continue;
            };
            stats.errors += 1;
            // Cells that only read a cycle's error text are not on the cycle
            let coord = cell.coord();
            if error == CellError::CircularDependency
                && (circular.contains(&coord) || referenced_cells(&cell.value).contains(&coord))
            {
                stats.circular_references += 1;
            }
        }

        tracing::debug!(
            "recomputed {} cells ({} formulas, {} errors, {} circular)",
            stats.cells_calculated,
            stats.formula_count,
            stats.errors,
            stats.circular_references
        );
        (next, stats)
    }

    /// Recompute the formulas affected by changes to `changed`
    ///
    /// Only the transitive dependents of the changed cells are evaluated,
    /// in dependency order.
    pub fn recompute_dirty(&self, sheet: &Sheet, changed: &[Coord]) -> Sheet {
        let graph = DependencyGraph::from_sheet(sheet);
        let circular = match self.options.cycles {
            CycleDetection::SelfReference => BTreeSet::new(),
            CycleDetection::Full => graph.circular_cells(),
        };

        let mut next = sheet.clone();
        for &coord in &circular {
            let cell = sheet.get(coord);
            store(&mut next, self.compute(coord, &cell.value, sheet, true));
        }

        let order = graph.get_recalc_order(changed);
        tracing::debug!("recomputing {} dirty formulas", order.len());
        for coord in order {
            let value = next.get(coord).value;
            let cell = self.compute(coord, &value, &next, false);
            store(&mut next, cell);
        }
        next
    }

    /// Every cell reads `sheet`; results land in a new sheet
    fn recompute_snapshot(&self, sheet: &Sheet, circular: &BTreeSet<Coord>) -> Sheet {
        let cells: Vec<Cell> = sheet
            .iter()
            .map(|cell| {
                let coord = cell.coord();
                self.compute(coord, &cell.value, sheet, circular.contains(&coord))
            })
            .collect();
        sheet.with_cells(cells)
    }

    /// Formulas run after their precedents and read fresh values
    fn recompute_ordered(
        &self,
        sheet: &Sheet,
        order: Vec<Coord>,
        circular: &BTreeSet<Coord>,
    ) -> Sheet {
        let mut next = sheet.clone();

        // Plain cells drop any stale computed value
        for cell in sheet.iter().filter(|cell| !cell.is_formula()) {
            store(&mut next, Cell::new(cell.coord(), cell.value.clone()));
        }

        for &coord in circular {
            let cell = sheet.get(coord);
            store(&mut next, self.compute(coord, &cell.value, sheet, true));
        }

        let ordered: BTreeSet<Coord> = order.iter().copied().collect();
        // Cycle members that were not reported (self-reference mode) run last
        let rest: Vec<Coord> = sheet
            .formula_cells()
            .map(Cell::coord)
            .filter(|coord| !ordered.contains(coord) && !circular.contains(coord))
            .collect();

        for coord in order.into_iter().chain(rest) {
            let value = next.get(coord).value;
            let cell = self.compute(coord, &value, &next, false);
            store(&mut next, cell);
        }

        next
    }
}

/// Write a cell whose coordinate is already known to lie in the grid
fn store(sheet: &mut Sheet, cell: Cell) {
    let coord = cell.coord();
    let stored = sheet.set(cell);
    debug_assert!(stored.is_ok(), "cell {} is outside the grid", coord);
    if let Err(e) = stored {
        tracing::error!("dropping cell {}: {}", coord, e);
    }
}

/// Extension trait for Sheet to add calculation methods
pub trait SheetCalculationExt {
    /// Compute a cell against this sheet with default options
    fn compute_cell(&self, cell: &Cell, new_value: Option<&str>) -> Cell;

    /// Apply edits in place with default options
    fn update_cells(&mut self, updates: &[CellUpdate], recompute: bool);

    /// Recompute all cells with default options
    fn recompute(&mut self) -> CalculationStats;

    /// Recompute all cells with custom options
    fn recompute_with_options(&mut self, options: &CalculationOptions) -> CalculationStats;
}

impl SheetCalculationExt for Sheet {
    fn compute_cell(&self, cell: &Cell, new_value: Option<&str>) -> Cell {
        CalculationEngine::default().compute_cell(cell, self, new_value)
    }

    fn update_cells(&mut self, updates: &[CellUpdate], recompute: bool) {
        *self = CalculationEngine::default().update_cells(self, updates, recompute);
    }

    fn recompute(&mut self) -> CalculationStats {
        self.recompute_with_options(&CalculationOptions::default())
    }

    fn recompute_with_options(&mut self, options: &CalculationOptions) -> CalculationStats {
        let engine = CalculationEngine::new(*options);
        let (next, stats) = engine.recompute_sheet_with_stats(self);
        *self = next;
        stats
    }
}

/// Read a cell; absent and out-of-bounds cells read as empty
pub fn get_cell(coord: Coord, sheet: &Sheet) -> Cell {
    sheet.get(coord)
}

/// Apply edits with the default engine
pub fn update_cells(sheet: &Sheet, updates: &[CellUpdate], recompute: bool) -> Sheet {
    CalculationEngine::default().update_cells(sheet, updates, recompute)
}

/// Recompute every cell with the default engine
pub fn recompute_sheet(sheet: &Sheet) -> Sheet {
    CalculationEngine::default().recompute_sheet(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> Coord {
        Coord::from_id(s).unwrap()
    }

    fn sheet_with(cells: &[(&str, &str)]) -> Sheet {
        let updates: Vec<CellUpdate> = cells
            .iter()
            .map(|(cell_id, value)| CellUpdate::parse(cell_id, *value).unwrap())
            .collect();
        update_cells(&Sheet::new(10, 10), &updates, false)
    }

    fn display(sheet: &Sheet, cell_id: &str) -> String {
        sheet.get(id(cell_id)).display_value().to_string()
    }

    #[test]
    fn test_compute_plain_cell() {
        let engine = CalculationEngine::default();
        let sheet = Sheet::new(5, 5);
        let cell = engine.compute_cell(&Cell::empty(id("A1")), &sheet, Some("hello"));
        assert_eq!(cell.value, "hello");
        assert_eq!(cell.computed_value, None);
        assert_eq!(cell.display_value(), "hello");
    }

    #[test]
    fn test_compute_formula_cell() {
        let engine = CalculationEngine::default();
        let sheet = sheet_with(&[("A1", "5"), ("B1", "10")]);
        let cell = engine.compute_cell(&Cell::empty(id("C1")), &sheet, Some("=SUM(A1,B1)/3"));
        assert_eq!(cell.computed_value.as_deref(), Some("5"));
    }

    #[test]
    fn test_compute_errors() {
        let engine = CalculationEngine::default();
        let sheet = sheet_with(&[("A1", "abc")]);
        let cases = [
            ("=", "#EMPTY_EXPRESSION"),
            ("=FOO(1)", "#INVALID_FUNCTION_NAME (FOO)"),
            ("=SUM(1+1)", "#INVALID_ARGUMENTS_IN_FUNCTION"),
            ("=A1:A2", "#RANGE_OUTSIDE_FUNCTION"),
            ("=1+", "#INVALID_OPERATION_FORMAT"),
            ("=SUM(B1)", "#CIRCULAR_DEPENDENCY"),
            ("=SUM(A1:ZZ99999)", "#INVALID_RANGE"),
            ("=1/0", "#INVALID_RESULT_TYPE"),
            ("=A1*2", "#ERROR"),
            ("=SUM()", "#ARGUMENTS_MUST_BE_PROVIDED"),
            ("=SUM(A1)", "#ARGUMENTS_MUST_BE_NUMBERS"),
        ];
        for (formula, expected) in cases {
            let cell = engine.compute_cell(&Cell::empty(id("B1")), &sheet, Some(formula));
            assert_eq!(cell.computed_value.as_deref(), Some(expected), "{formula}");
            assert_eq!(cell.value, formula);
        }
    }

    #[test]
    fn test_compute_cell_detects_rings() {
        let sheet = sheet_with(&[("A1", "=B1")]);
        let full = CalculationEngine::default();
        let cell = full.compute_cell(&Cell::empty(id("B1")), &sheet, Some("=A1"));
        assert_eq!(cell.display_value(), "#CIRCULAR_DEPENDENCY");

        let narrow = CalculationEngine::new(CalculationOptions::reference());
        let cell = narrow.compute_cell(&Cell::empty(id("B1")), &sheet, Some("=A1"));
        assert_eq!(cell.display_value(), "=B1");
    }

    #[test]
    fn test_update_cells_commit_and_delete() {
        let sheet = sheet_with(&[("A1", "5")]);
        let next = update_cells(
            &sheet,
            &[
                CellUpdate::parse("B1", "=A1*2").unwrap(),
                CellUpdate::parse("A1", "").unwrap(),
            ],
            true,
        );
        // Evaluated against the sheet as it was before the batch
        assert_eq!(display(&next, "B1"), "10");
        assert!(next.get_ref(id("A1")).is_none());
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_update_cells_raw_keeps_computed_value() {
        let sheet = update_cells(&Sheet::new(5, 5), &[CellUpdate::parse("A1", "=SUM(1,2)").unwrap()], true);
        let typing = update_cells(&sheet, &[CellUpdate::parse("A1", "=SUM(1,2,").unwrap()], false);
        let cell = typing.get(id("A1"));
        assert_eq!(cell.value, "=SUM(1,2,");
        assert_eq!(cell.computed_value.as_deref(), Some("3"));
    }

    #[test]
    fn test_update_outside_grid_is_skipped() {
        let sheet = Sheet::new(2, 2);
        let next = update_cells(&sheet, &[CellUpdate::new(Coord::new(5, 5), "1")], true);
        assert!(next.is_empty());
    }

    #[test]
    fn test_recompute_dependency_order_reaches_fixed_point() {
        let sheet = sheet_with(&[("A1", "=B1+1"), ("B1", "=C1+1"), ("C1", "1")]);
        let next = recompute_sheet(&sheet);
        assert_eq!(display(&next, "A1"), "3");
        assert_eq!(display(&next, "B1"), "2");
        assert_eq!(recompute_sheet(&next), next);
    }

    #[test]
    fn test_recompute_snapshot_advances_one_generation() {
        let engine = CalculationEngine::new(CalculationOptions::reference());
        let sheet = sheet_with(&[("A1", "=B1+1"), ("B1", "=C1+1"), ("C1", "1")]);

        let first = engine.recompute_sheet(&sheet);
        assert_eq!(display(&first, "B1"), "2");
        // B1 had no computed value yet, so A1 read its raw text
        assert_eq!(display(&first, "A1"), "#ERROR");

        let second = engine.recompute_sheet(&first);
        assert_eq!(display(&second, "A1"), "3");
    }

    #[test]
    fn test_recompute_stats() {
        let engine = CalculationEngine::default();
        let sheet = sheet_with(&[
            ("A1", "=B1"),
            ("B1", "=A1"),
            ("C1", "=FOO()"),
            ("D1", "=SUM(1)"),
            ("E1", "x"),
        ]);
        let (next, stats) = engine.recompute_sheet_with_stats(&sheet);
        assert_eq!(
            stats,
            CalculationStats {
                formula_count: 4,
                cells_calculated: 5,
                circular_references: 2,
                errors: 3,
            }
        );
        assert_eq!(display(&next, "A1"), "#CIRCULAR_DEPENDENCY");
        assert_eq!(display(&next, "D1"), "1");
    }

    #[test]
    fn test_recompute_dirty() {
        let engine = CalculationEngine::default();
        let sheet = recompute_sheet(&sheet_with(&[
            ("A1", "1"),
            ("B1", "=A1*2"),
            ("C1", "=B1+1"),
        ]));
        let edited = update_cells(&sheet, &[CellUpdate::parse("A1", "5").unwrap()], true);
        let next = engine.recompute_dirty(&edited, &[id("A1")]);
        assert_eq!(display(&next, "B1"), "10");
        assert_eq!(display(&next, "C1"), "11");
    }

    #[test]
    fn test_sheet_extension() {
        let mut sheet = Sheet::new(5, 5);
        sheet.update_cells(&[CellUpdate::parse("A1", "2").unwrap()], true);
        sheet.update_cells(&[CellUpdate::parse("A2", "=MULTIPLY(A1, 3)").unwrap()], true);
        assert_eq!(display(&sheet, "A2"), "6");

        let cell = sheet.compute_cell(&sheet.get(id("A3")), Some("=A2-1"));
        assert_eq!(cell.display_value(), "5");

        let stats = sheet.recompute_with_options(&CalculationOptions::reference());
        assert_eq!(stats.formula_count, 1);
    }

    #[test]
    fn test_store_writes_in_bounds() {
        let mut sheet = Sheet::new(2, 2);
        store(&mut sheet, Cell::new(id("B2"), "1"));
        assert_eq!(display(&sheet, "B2"), "1");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside the grid")]
    fn test_store_out_of_bounds_is_caught() {
        let mut sheet = Sheet::new(2, 2);
        store(&mut sheet, Cell::new(Coord::new(5, 5), "1"));
    }

    #[test]
    fn test_compute_cell_walks_only_reached_formulas() {
        let engine = CalculationEngine::default();
        let sheet = sheet_with(&[("A1", "=B1"), ("B1", "=C1"), ("D1", "=E1")]);
        let closes = engine.compute_cell(&Cell::empty(id("C1")), &sheet, Some("=A1+1"));
        assert_eq!(closes.display_value(), "#CIRCULAR_DEPENDENCY");

        let open = engine.compute_cell(&Cell::empty(id("C1")), &sheet, Some("=D1+1"));
        assert_eq!(open.display_value(), "#ERROR");
    }
}
