//! Dependency tracking for formula calculation

use hoja_core::{Coord, Sheet};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::expression::referenced_cells;

/// Dependency graph for formula cells
///
/// Tracks which cells depend on which other cells, enabling ordered
/// recalculation and detection of reference cycles of any length.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Cell → Cells that depend on it (dependents)
    dependents: HashMap<Coord, HashSet<Coord>>,
    /// Cell → Cells it depends on (precedents)
    precedents: HashMap<Coord, HashSet<Coord>>,
    /// Cells holding formulas, row-major
    formulas: BTreeSet<Coord>,
}

/// Formula cells split into an evaluation order and the cells on cycles
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationPlan {
    /// Formulas not on a cycle, each after every formula it reads
    pub order: Vec<Coord>,
    /// Formulas on a cycle of any length, self-references included
    pub circular: BTreeSet<Coord>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every formula cell of a sheet
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let mut graph = Self::new();
        for cell in sheet.formula_cells() {
            graph.set_precedents(cell.coord(), referenced_cells(&cell.value));
        }
        tracing::trace!(
            "dependency graph: {} formulas, {} referenced cells",
            graph.formulas.len(),
            graph.dependents.len()
        );
        graph
    }

    /// Replace the precedents of a formula cell
    pub fn set_precedents<I: IntoIterator<Item = Coord>>(&mut self, cell: Coord, precedents: I) {
        self.clear_precedents(cell);
        self.formulas.insert(cell);
        for precedent in precedents {
            self.add_dependency(precedent, cell);
        }
    }

    /// Add a dependency: dependent depends on precedent
    pub fn add_dependency(&mut self, precedent: Coord, dependent: Coord) {
        self.dependents
            .entry(precedent)
            .or_default()
            .insert(dependent);
        self.precedents
            .entry(dependent)
            .or_default()
            .insert(precedent);
    }

    /// Forget a cell's own precedents, keeping cells that depend on it
    fn clear_precedents(&mut self, cell: Coord) {
        if let Some(precedents) = self.precedents.remove(&cell) {
            for precedent in precedents {
                if let Some(deps) = self.dependents.get_mut(&precedent) {
                    deps.remove(&cell);
                    if deps.is_empty() {
                        self.dependents.remove(&precedent);
                    }
                }
            }
        }
    }

    /// Remove a cell from the graph entirely
    pub fn remove(&mut self, cell: Coord) {
        self.clear_precedents(cell);
        self.formulas.remove(&cell);

        if let Some(dependents) = self.dependents.remove(&cell) {
            for dependent in dependents {
                if let Some(precs) = self.precedents.get_mut(&dependent) {
                    precs.remove(&cell);
                }
            }
        }
    }

    /// Get cells that depend on the given cell
    pub fn get_dependents(&self, cell: Coord) -> impl Iterator<Item = Coord> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get cells that the given cell depends on
    pub fn get_precedents(&self, cell: Coord) -> impl Iterator<Item = Coord> + '_ {
        self.precedents
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Number of formula cells in the graph
    pub fn formula_count(&self) -> usize {
        self.formulas.len()
    }

    /// Is the cell reachable from its own precedents?
    ///
    /// A formula reading its own cell, directly or through a range, is the
    /// shortest cycle; `A1 → B1 → A1` is found the same way.
    pub fn is_circular(&self, cell: Coord) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<Coord> = self.get_precedents(cell).collect();

        while let Some(current) = stack.pop() {
            if current == cell {
                return true;
            }
            if visited.insert(current) {
                stack.extend(self.get_precedents(current));
            }
        }
        false
    }

    /// All formula cells that lie on a cycle, row-major
    pub fn circular_cells(&self) -> BTreeSet<Coord> {
        self.plan().circular
    }

    /// Formula cells not on a cycle, each after every formula it reads
    ///
    /// Ties are broken row-major, so the order is deterministic.
    pub fn evaluation_order(&self) -> Vec<Coord> {
        self.plan().order
    }

    /// Split the formula cells into an evaluation order and the cycle members
    ///
    /// One pass of Tarjan's strongly connected components over the
    /// formula-to-formula precedent edges, with an explicit stack. A component
    /// is emitted only after every component it reads, so non-cyclic
    /// components come out in evaluation order.
    pub fn plan(&self) -> EvaluationPlan {
        let mut plan = EvaluationPlan::default();
        let mut index: HashMap<Coord, usize> = HashMap::with_capacity(self.formulas.len());
        let mut lowlink: HashMap<Coord, usize> = HashMap::with_capacity(self.formulas.len());
        let mut on_stack: HashSet<Coord> = HashSet::new();
        let mut component_stack: Vec<Coord> = Vec::new();
        // (cell, its formula precedents, next precedent to visit)
        let mut work: Vec<(Coord, Vec<Coord>, usize)> = Vec::new();
        let mut next_index = 0;

        for &root in &self.formulas {
            if index.contains_key(&root) {
                continue;
            }

            index.insert(root, next_index);
            lowlink.insert(root, next_index);
            next_index += 1;
            component_stack.push(root);
            on_stack.insert(root);
            work.push((root, self.formula_precedents(root), 0));

            while let Some(frame) = work.last_mut() {
                let cell = frame.0;
                let next = frame.1.get(frame.2).copied();

                if let Some(precedent) = next {
                    frame.2 += 1;
                    if !index.contains_key(&precedent) {
                        index.insert(precedent, next_index);
                        lowlink.insert(precedent, next_index);
                        next_index += 1;
                        component_stack.push(precedent);
                        on_stack.insert(precedent);
                        work.push((precedent, self.formula_precedents(precedent), 0));
                    } else if on_stack.contains(&precedent) {
                        let low = lowlink[&cell].min(index[&precedent]);
                        lowlink.insert(cell, low);
                    }
                    continue;
                }

                work.pop();
                let cell_low = lowlink[&cell];
                if let Some(parent) = work.last() {
                    let low = lowlink[&parent.0].min(cell_low);
                    lowlink.insert(parent.0, low);
                }

                if cell_low != index[&cell] {
                    continue;
                }

                let mut component = Vec::new();
                while let Some(member) = component_stack.pop() {
                    on_stack.remove(&member);
                    component.push(member);
                    if member == cell {
                        break;
                    }
                }

                let reads_itself = self
                    .precedents
                    .get(&cell)
                    .map_or(false, |precs| precs.contains(&cell));
                if component.len() > 1 || reads_itself {
                    plan.circular.extend(component);
                } else {
                    plan.order.push(cell);
                }
            }
        }

        plan
    }

    /// Precedents of a cell that are formulas themselves, row-major
    fn formula_precedents(&self, cell: Coord) -> Vec<Coord> {
        let mut precedents: Vec<Coord> = self
            .get_precedents(cell)
            .filter(|precedent| self.formulas.contains(precedent))
            .collect();
        precedents.sort();
        precedents
    }

    /// Formula cells to recalculate when the given cells change
    ///
    /// Returns the transitive dependents of `changed` (and any changed
    /// formula cells themselves) in evaluation order.
    pub fn get_recalc_order(&self, changed: &[Coord]) -> Vec<Coord> {
        let mut dirty = HashSet::new();
        let mut stack: Vec<Coord> = changed.to_vec();

        while let Some(cell) = stack.pop() {
            if !dirty.insert(cell) {
                continue;
            }
            stack.extend(self.get_dependents(cell));
        }

        self.evaluation_order()
            .into_iter()
            .filter(|cell| dirty.contains(cell))
            .collect()
    }

    /// Clear the entire graph
    pub fn clear(&mut self) {
        self.dependents.clear();
        self.precedents.clear();
        self.formulas.clear();
    }
}

/// Does following formula references from `start` lead to `target`?
///
/// Walks the formulas of `sheet` lazily, scanning only the cells actually
/// reached. `target` itself is never expanded, so its stored value does not
/// matter; this checks a new value for `target` before it is stored.
pub fn reaches<I: IntoIterator<Item = Coord>>(sheet: &Sheet, start: I, target: Coord) -> bool {
    let mut visited = HashSet::new();
    let mut stack: Vec<Coord> = start.into_iter().collect();

    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(cell) = sheet.get_ref(current) {
            if cell.is_formula() {
                stack.extend(referenced_cells(&cell.value));
            }
        }
    }
    false
}
