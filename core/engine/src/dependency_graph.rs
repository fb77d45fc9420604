//! FILENAME: core/engine/src/dependency_graph.rs
//! PURPOSE: Implements the Directed Acyclic Graph (DAG) for tracking cell dependencies.
//! CONTEXT: This module is the heart of the spreadsheet's recalculation engine.
//! It tracks which cells depend on which other cells (precedents/dependents),
//! detects circular references, and computes the correct evaluation order
//! using topological sorting. One graph exists per workbook; keys carry the
//! sheet index so cross-sheet edges live in the same structure.
//!
//! TERMINOLOGY:
//! - Precedents: Cells that a formula cell references (its inputs).
//!   If A3 = A1 + A2, then A1 and A2 are precedents of A3.
//! - Dependents: Cells that reference a given cell (reverse lookup).
//!   If A3 = A1 + A2, then A3 is a dependent of A1 and A2.
//! - Range precedents: rectangles a formula reads (SUM(B1:B100), C:C). They
//!   are kept as rectangles and matched by containment instead of being
//!   expanded into per-cell edges.
//!
//! USAGE:
//! 1. Before committing a formula, call `would_create_cycle()`.
//! 2. Call `set_dependencies()` with the cell's extracted `Dependencies`.
//! 3. After values change, collect `transitive_dependents()` and evaluate them
//!    in `topological_order()`.

use crate::coord::{CellKey, CellRange};
use crate::dependency_extractor::Dependencies;
use rustc_hash::{FxHashMap, FxHashSet};
use rstar::{RTree, RTreeObject, AABB};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// Error type for cycle detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    /// The cells that could not be ordered, ascending.
    pub cycle_cells: Vec<CellKey>,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Circular reference detected: ")?;
        for (i, key) in self.cycle_cells.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleError {}

/// The Dependency Graph tracks relationships between cells.
/// It maintains both forward (precedents) and reverse (dependents) mappings
/// for efficient lookups in either direction.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// For each formula cell, the single cells it directly reads.
    precedents: FxHashMap<CellKey, FxHashSet<CellKey>>,

    /// For each cell, the formula cells that read it directly.
    dependents: FxHashMap<CellKey, FxHashSet<CellKey>>,

    /// For each formula cell, the rectangles it reads.
    range_precedents: FxHashMap<CellKey, SmallVec<[CellRange; 2]>>,

    /// For each formula cell, the variables it reads.
    name_precedents: FxHashMap<CellKey, BTreeSet<String>>,

    /// For each variable, the formula cells that read it.
    name_dependents: FxHashMap<String, BTreeSet<CellKey>>,

    /// Every cell holding a formula, including cells whose edges were rejected.
    formula_cells: BTreeSet<CellKey>,

    /// Reverse lookup for `range_precedents`.
    range_index: RangeIndex,
}

/// One range precedent in the R-tree: the formula reading it and the
/// rectangle as (row, col) corners.
#[derive(Debug, Clone)]
struct RangeEntry {
    formula: CellKey,
    envelope: AABB<[i64; 2]>,
}

impl RangeEntry {
    fn new(formula: CellKey, range: &CellRange) -> Self {
        RangeEntry {
            formula,
            envelope: AABB::from_corners(
                [i64::from(range.start_row), i64::from(range.start_col)],
                [i64::from(range.end_row), i64::from(range.end_col)],
            ),
        }
    }
}

impl PartialEq for RangeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.formula == other.formula && self.envelope == other.envelope
    }
}

impl RTreeObject for RangeEntry {
    type Envelope = AABB<[i64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Per-sheet R-trees of range precedents, so finding the formulas whose
/// ranges contain a cell does not scan every range in the workbook.
#[derive(Debug, Clone, Default)]
struct RangeIndex {
    sheets: FxHashMap<u32, RTree<RangeEntry>>,
}

impl RangeIndex {
    fn insert(&mut self, formula: CellKey, range: &CellRange) {
        self.sheets
            .entry(range.sheet)
            .or_default()
            .insert(RangeEntry::new(formula, range));
    }

    fn remove(&mut self, formula: CellKey, range: &CellRange) {
        if let Some(tree) = self.sheets.get_mut(&range.sheet) {
            tree.remove(&RangeEntry::new(formula, range));
            if tree.size() == 0 {
                self.sheets.remove(&range.sheet);
            }
        }
    }

    /// Formulas with a range containing `cell`. A formula appears once per
    /// matching range.
    fn containing(&self, cell: CellKey) -> impl Iterator<Item = CellKey> + '_ {
        let point = AABB::from_point([i64::from(cell.row), i64::from(cell.col)]);
        self.sheets
            .get(&cell.sheet)
            .into_iter()
            .flat_map(move |tree| tree.locate_in_envelope_intersecting(&point))
            .map(|entry| entry.formula)
    }
}

impl DependencyGraph {
    /// Creates a new, empty dependency graph.
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Registers `cell` as a formula cell and replaces its outgoing edges.
    ///
    /// # Note
    /// This does NOT check for cycles. Use `would_create_cycle()` first.
    pub fn set_dependencies(&mut self, cell: CellKey, deps: Dependencies) {
        self.clear_dependencies(cell);
        self.formula_cells.insert(cell);

        if !deps.cells.is_empty() {
            for &prec in &deps.cells {
                self.dependents.entry(prec).or_default().insert(cell);
            }
            self.precedents.insert(cell, deps.cells.into_iter().collect());
        }

        if !deps.ranges.is_empty() {
            for range in &deps.ranges {
                self.range_index.insert(cell, range);
            }
            self.range_precedents.insert(cell, deps.ranges);
        }

        if !deps.names.is_empty() {
            for name in &deps.names {
                self.name_dependents
                    .entry(name.clone())
                    .or_default()
                    .insert(cell);
            }
            self.name_precedents.insert(cell, deps.names);
        }
    }

    /// Registers `cell` as a formula cell without any outgoing edges.
    /// Used for formulas whose edges were rejected because of a cycle.
    pub fn register_formula(&mut self, cell: CellKey) {
        self.clear_dependencies(cell);
        self.formula_cells.insert(cell);
    }

    /// Forgets a cell completely. Call this when a formula is replaced by a
    /// literal or cleared. Edges pointing at the cell are kept.
    pub fn remove_formula(&mut self, cell: CellKey) {
        self.clear_dependencies(cell);
        self.formula_cells.remove(&cell);
    }

    /// Clears all outgoing edges of a cell.
    pub fn clear_dependencies(&mut self, cell: CellKey) {
        if let Some(old_precs) = self.precedents.remove(&cell) {
            for prec in old_precs {
                if let Some(deps) = self.dependents.get_mut(&prec) {
                    deps.remove(&cell);
                    // Clean up empty sets
                    if deps.is_empty() {
                        self.dependents.remove(&prec);
                    }
                }
            }
        }

        if let Some(ranges) = self.range_precedents.remove(&cell) {
            for range in &ranges {
                self.range_index.remove(cell, range);
            }
        }

        if let Some(names) = self.name_precedents.remove(&cell) {
            for name in names {
                if let Some(cells) = self.name_dependents.get_mut(&name) {
                    cells.remove(&cell);
                    if cells.is_empty() {
                        self.name_dependents.remove(&name);
                    }
                }
            }
        }
    }

    pub fn is_formula(&self, cell: CellKey) -> bool {
        self.formula_cells.contains(&cell)
    }

    pub fn formula_cells(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.formula_cells.iter().copied()
    }

    /// Returns the direct single-cell precedents of a cell.
    pub fn get_precedents(&self, cell: CellKey) -> Option<&FxHashSet<CellKey>> {
        self.precedents.get(&cell)
    }

    /// Returns the rectangles a cell reads.
    pub fn get_range_precedents(&self, cell: CellKey) -> &[CellRange] {
        self.range_precedents
            .get(&cell)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    /// Formula cells that read `cell` directly or through a range, ascending.
    pub fn direct_dependents(&self, cell: CellKey) -> BTreeSet<CellKey> {
        let mut out: BTreeSet<CellKey> = self
            .dependents
            .get(&cell)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default();

        out.extend(self.range_index.containing(cell));

        out
    }

    /// Formula cells that read the named variable.
    pub fn dependents_of_name(&self, name: &str) -> BTreeSet<CellKey> {
        self.name_dependents
            .get(&name.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Formula cells located inside `range`, ascending.
    fn formulas_in(&self, range: &CellRange) -> impl Iterator<Item = CellKey> + '_ {
        let lo = CellKey::new(range.sheet, range.start_row, 0);
        let hi = CellKey::new(range.sheet, range.end_row, u32::MAX);
        let range = *range;
        self.formula_cells
            .range(lo..=hi)
            .copied()
            .filter(move |k| k.col >= range.start_col && k.col <= range.end_col)
    }

    /// Checks if giving `cell` these dependencies would create a cycle.
    /// This performs a DFS from each new precedent to see if we can reach the cell.
    pub fn would_create_cycle(&self, cell: CellKey, deps: &Dependencies) -> bool {
        // A cell reading itself is a trivial cycle
        if deps.reads(cell) {
            return true;
        }
        // Nothing reads `cell`, so no path can lead back to it
        if self.direct_dependents(cell).is_empty() {
            return false;
        }

        let mut stack: Vec<CellKey> = deps.cells.iter().copied().collect();
        for range in &deps.ranges {
            stack.extend(self.formulas_in(range));
        }

        self.can_reach(stack, cell)
    }

    /// Checks if any of `start` can reach `target` by following precedent chains.
    fn can_reach(&self, mut stack: Vec<CellKey>, target: CellKey) -> bool {
        let mut visited = FxHashSet::default();

        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }

            // Follow precedent chain (what does `current` depend on?)
            if let Some(precs) = self.precedents.get(&current) {
                stack.extend(precs.iter().filter(|p| !visited.contains(*p)).copied());
            }
            for range in self.get_range_precedents(current) {
                if range.contains(target) {
                    return true;
                }
                stack.extend(self.formulas_in(range).filter(|p| !visited.contains(p)));
            }
        }

        false
    }

    /// Gets all transitive dependents of the seed cells. Seeds are only
    /// included when another seed reaches them.
    pub fn transitive_dependents<I>(&self, seeds: I) -> BTreeSet<CellKey>
    where
        I: IntoIterator<Item = CellKey>,
    {
        let mut result = BTreeSet::new();
        let mut stack: Vec<CellKey> = Vec::new();

        for seed in seeds {
            stack.extend(self.direct_dependents(seed));
        }

        while let Some(current) = stack.pop() {
            if !result.insert(current) {
                continue;
            }
            for dep in self.direct_dependents(current) {
                if !result.contains(&dep) {
                    stack.push(dep);
                }
            }
        }

        result
    }

    /// Precedents of `cell` that are members of `subset`.
    fn precedents_within(&self, cell: CellKey, subset: &BTreeSet<CellKey>) -> FxHashSet<CellKey> {
        let mut out = FxHashSet::default();
        if let Some(precs) = self.precedents.get(&cell) {
            out.extend(precs.iter().filter(|p| subset.contains(*p)).copied());
        }
        for range in self.get_range_precedents(cell) {
            let lo = CellKey::new(range.sheet, range.start_row, 0);
            let hi = CellKey::new(range.sheet, range.end_row, u32::MAX);
            out.extend(
                subset
                    .range(lo..=hi)
                    .filter(|k| k.col >= range.start_col && k.col <= range.end_col)
                    .copied(),
            );
        }
        out.remove(&cell);
        out
    }

    /// Orders a subset of cells so each comes after all its precedents in the
    /// subset (Kahn's algorithm). Among ready cells the smallest key
    /// (sheet, row, column) goes first, which makes the order deterministic.
    ///
    /// # Returns
    /// - `Ok(Vec<CellKey>)` - The sorted cells.
    /// - `Err(CycleError)` - If some cells could not be ordered.
    pub fn topological_order(&self, cells: &BTreeSet<CellKey>) -> Result<Vec<CellKey>, CycleError> {
        let mut in_degree: FxHashMap<CellKey, usize> = FxHashMap::default();
        for &cell in cells {
            in_degree.insert(cell, self.precedents_within(cell, cells).len());
        }

        let mut ready: BinaryHeap<Reverse<CellKey>> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&cell, _)| Reverse(cell))
            .collect();

        let mut result = Vec::with_capacity(cells.len());

        while let Some(Reverse(cell)) = ready.pop() {
            result.push(cell);

            // Decrease in-degree for all dependents in the subset
            for dep in self.direct_dependents(cell) {
                if dep == cell {
                    continue;
                }
                if let Some(deg) = in_degree.get_mut(&dep) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.push(Reverse(dep));
                    }
                }
            }
        }

        // If we didn't process all cells, there's a cycle
        if result.len() != cells.len() {
            let mut cycle_cells: Vec<CellKey> = in_degree
                .iter()
                .filter(|(_, &deg)| deg > 0)
                .map(|(&cell, _)| cell)
                .collect();
            cycle_cells.sort();
            return Err(CycleError { cycle_cells });
        }

        Ok(result)
    }

    /// Returns the total number of formula cells.
    pub fn formula_cell_count(&self) -> usize {
        self.formula_cells.len()
    }

    /// Returns the total number of single-cell and range dependency relationships.
    pub fn dependency_count(&self) -> usize {
        self.precedents.values().map(|v| v.len()).sum::<usize>()
            + self.range_precedents.values().map(|v| v.len()).sum::<usize>()
    }

    /// Clears the entire dependency graph.
    pub fn clear(&mut self) {
        *self = DependencyGraph::default();
    }
}
