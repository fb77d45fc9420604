//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Manages the collection of cells of one sheet.
//! CONTEXT: This file defines the `Grid` struct which acts as the container
//! for all cell data. It uses a sparse storage strategy (hash map) to
//! efficiently handle massive spreadsheets where most cells are empty.

use crate::cell::Cell;
use crate::coord::CellCoord;
use rustc_hash::FxHashMap;

/// The Grid struct holds the state of the spreadsheet data.
/// Row and Col are 0-based indices.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse storage: keys are (row, col), values are Cell instances.
    cells: FxHashMap<CellCoord, Cell>,

    /// Tracks the highest row index currently in use.
    pub max_row: u32,

    /// Tracks the highest column index currently in use.
    pub max_col: u32,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid::default()
    }

    /// Sets a cell at the specified coordinates.
    /// Updates max_row/max_col boundaries automatically.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        if row > self.max_row {
            self.max_row = row;
        }
        if col > self.max_col {
            self.max_col = col;
        }
        self.cells.insert((row, col), cell);
    }

    /// Retrieves a reference to a cell at the specified coordinates.
    /// Returns None if the cell is empty (not stored).
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn get_cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&(row, col))
    }

    /// Removes a cell from the grid (clearing it) and returns what was there.
    /// If the cell was at a boundary (max_row or max_col), recalculates bounds.
    pub fn clear_cell(&mut self, row: u32, col: u32) -> Option<Cell> {
        let removed = self.cells.remove(&(row, col));
        if removed.is_some() && (row == self.max_row || col == self.max_col) {
            self.recalculate_bounds();
        }
        removed
    }

    /// Recalculates max_row and max_col by scanning all cells.
    pub fn recalculate_bounds(&mut self) {
        self.max_row = self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0);
        self.max_col = self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0);
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All stored cells, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &Cell)> {
        self.cells.iter().map(|(&coord, cell)| (coord, cell))
    }

    /// Coordinates of every formula cell, sorted by row then column.
    pub fn formula_coords(&self) -> Vec<CellCoord> {
        let mut coords: Vec<CellCoord> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(&coord, _)| coord)
            .collect();
        coords.sort_unstable();
        coords
    }
}
