//! FILENAME: core/engine/src/workbook.rs
//! PURPOSE: The spreadsheet: ordered sheets, variables and the dependency graph.
//! CONTEXT: Every mutation goes through `set_cells`, which parses the whole
//! batch before touching anything, rewires the dependency graph, and (in
//! automatic mode) recalculates everything downstream before returning. The
//! graph is scoped to the workbook; nothing here is process-wide.
//!
//! CYCLES: a formula whose new edges would close a cycle keeps no edges at
//! all and is listed as blocked. Blocked cells evaluate to #CIRCULAR! and are
//! retried after every edit, so breaking the cycle heals them.

use crate::cell::{Cell, CellContent, CellValue};
use crate::coord::{CellCoord, CellKey, CellRange};
use crate::dependency_extractor::{extract_dependencies, resolve_range, SheetLookup};
use crate::dependency_graph::DependencyGraph;
use crate::error::{EngineError, EngineResult};
use crate::evaluator::{CellSource, Evaluator};
use crate::grid::Grid;
use crate::recalc::{CalculationMode, RecalcReport};
use parser::{parse, Expression, Parser, FORMULA_MARKER};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One sheet of a workbook. Its index is its position, which never changes
/// because sheets are only appended.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub(crate) grid: Grid,
}

impl Sheet {
    fn new(name: String) -> Self {
        Sheet {
            name,
            grid: Grid::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

/// A cell as seen by readers of a range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub value: CellValue,
    pub formula: Option<String>,
    /// True when the value awaits recalculation (manual mode only).
    pub stale: bool,
}

impl Default for CellSnapshot {
    fn default() -> Self {
        CellSnapshot {
            value: CellValue::Empty,
            formula: None,
            stale: false,
        }
    }
}

/// Who wrote a cell. `id` tells writers apart (two participants may share a
/// display name); `name` is what people see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Editor {
    pub id: String,
    pub name: String,
}

impl Editor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Editor {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A last-write-wins overwrite of another editor's cell. Editors are given
/// by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overwrite {
    pub cell: CellKey,
    pub previous_editor: String,
    pub by: String,
}

/// Result of a committed edit batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditOutcome {
    pub report: RecalcReport,
    /// Edited cells plus every recalculated cell, ascending.
    pub changed: Vec<CellKey>,
    pub overwritten: Vec<Overwrite>,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct Workbook {
    name: String,
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) graph: DependencyGraph,
    /// Upper-cased variable names.
    variables: BTreeMap<String, CellValue>,
    mode: CalculationMode,
    /// Edited cells whose consequences have not been recalculated yet.
    pub(crate) dirty: BTreeSet<CellKey>,
    /// Formula cells whose edges were rejected because they close a cycle.
    pub(crate) blocked: BTreeSet<CellKey>,
    revision: u64,
    /// Last editor of each non-empty cell written by an identified editor.
    editors: FxHashMap<CellKey, Editor>,
}

impl Workbook {
    /// Creates a workbook with a single sheet named "Sheet1".
    pub fn new(name: impl Into<String>) -> Self {
        Workbook {
            name: name.into(),
            sheets: vec![Sheet::new("Sheet1".to_string())],
            graph: DependencyGraph::new(),
            variables: BTreeMap::new(),
            mode: CalculationMode::Automatic,
            dirty: BTreeSet::new(),
            blocked: BTreeSet::new(),
            revision: 0,
            editors: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    // ========================================================================
    // SHEETS
    // ========================================================================

    /// Appends a sheet and returns its index. Formulas that referenced the
    /// name before it existed start resolving, so the graph is rebuilt.
    pub fn add_sheet(&mut self, name: &str) -> EngineResult<u32> {
        let name = name.trim();
        if name.is_empty() || self.sheet_index(name).is_some() {
            return Err(EngineError::DuplicateSheet(name.to_string()));
        }
        self.sheets.push(Sheet::new(name.to_string()));
        let index = (self.sheets.len() - 1) as u32;
        crate::log_info!("WORKBOOK", "added sheet '{}' at index {}", name, index);
        self.rebuild_all();
        Ok(index)
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, index: u32) -> Option<&Sheet> {
        self.sheets.get(index as usize)
    }

    fn check_sheet(&self, index: u32) -> EngineResult<&Sheet> {
        self.sheets
            .get(index as usize)
            .ok_or(EngineError::SheetOutOfRange {
                index,
                count: self.sheets.len(),
            })
    }

    // ========================================================================
    // CELLS
    // ========================================================================

    pub fn get_cell(&self, sheet: u32, row: u32, col: u32) -> Option<&Cell> {
        self.sheets.get(sheet as usize)?.grid.get_cell(row, col)
    }

    /// Sets one cell. See `set_cells`.
    pub fn set_cell(
        &mut self,
        sheet: u32,
        row: u32,
        col: u32,
        content: CellContent,
    ) -> EngineResult<EditOutcome> {
        self.set_cells(vec![(CellKey::new(sheet, row, col), content)], None)
    }

    /// Applies a batch of edits as one unit.
    ///
    /// All formulas are parsed first; a parse error rejects the whole batch
    /// and leaves the workbook untouched. Later edits of the same cell win.
    /// When `editor` is given, overwriting or clearing a cell last written
    /// by a different editor is reported in `EditOutcome::overwritten`.
    /// Anonymous writes and clears forget the cell's last editor.
    pub fn set_cells(
        &mut self,
        edits: Vec<(CellKey, CellContent)>,
        editor: Option<&Editor>,
    ) -> EngineResult<EditOutcome> {
        crate::log_enter!("WORKBOOK", "set_cells", "count={}", edits.len());

        let mut prepared: Vec<(CellKey, CellContent, Option<Expression>)> =
            Vec::with_capacity(edits.len());
        for (key, content) in edits {
            self.check_sheet(key.sheet)?;
            let ast = match &content {
                CellContent::Formula(src) => match parse(src) {
                    Ok(ast) => Some(ast),
                    Err(e) => {
                        crate::log_debug!("PARSE", "rejected {} at {}: {}", src, key, e);
                        return Err(e.into());
                    }
                },
                _ => None,
            };
            prepared.push((key, content, ast));
        }

        let mut overwritten = Vec::new();
        let mut edited: BTreeSet<CellKey> = BTreeSet::new();
        let mut new_formulas: BTreeSet<CellKey> = BTreeSet::new();

        for (key, content, ast) in prepared {
            let keeps_content = match &content {
                CellContent::Empty => false,
                CellContent::Value(v) => !v.is_empty(),
                CellContent::Formula(_) => true,
            };
            self.note_editor(key, editor, keeps_content, &mut overwritten);

            let grid = match self.sheets.get_mut(key.sheet as usize) {
                Some(sheet) => &mut sheet.grid,
                None => continue,
            };

            match (content, ast) {
                (CellContent::Formula(src), Some(ast)) => {
                    grid.set_cell(key.row, key.col, Cell::new_formula(src, ast));
                    // Old outgoing edges go now; new ones are linked below.
                    self.graph.register_formula(key);
                    new_formulas.insert(key);
                }
                (CellContent::Value(value), _) if !value.is_empty() => {
                    grid.set_cell(key.row, key.col, Cell::new_value(value));
                    self.graph.remove_formula(key);
                    new_formulas.remove(&key);
                }
                _ => {
                    grid.clear_cell(key.row, key.col);
                    self.graph.remove_formula(key);
                    new_formulas.remove(&key);
                }
            }
            self.blocked.remove(&key);
            edited.insert(key);
        }

        let mut seeds = edited.clone();
        for key in new_formulas {
            self.link_formula(key);
        }

        // An edit may have broken a cycle that blocked an older formula.
        let retry: Vec<CellKey> = self
            .blocked
            .iter()
            .filter(|k| !edited.contains(*k))
            .copied()
            .collect();
        for key in retry {
            if self.link_formula(key) {
                crate::log_debug!("RECALC", "{} no longer circular", key);
                seeds.insert(key);
            }
        }

        self.revision += 1;
        self.dirty.extend(seeds);
        let report = self.recalculate_if_automatic();

        let mut changed: BTreeSet<CellKey> = edited;
        changed.extend(report.recalculated.iter().copied());

        crate::log_exit!(
            "WORKBOOK",
            "set_cells",
            "revision={} changed={}",
            self.revision,
            changed.len()
        );

        Ok(EditOutcome {
            report,
            changed: changed.into_iter().collect(),
            overwritten,
            revision: self.revision,
        })
    }

    fn note_editor(
        &mut self,
        key: CellKey,
        by: Option<&Editor>,
        keeps_content: bool,
        overwritten: &mut Vec<Overwrite>,
    ) {
        let previous = self.editors.remove(&key);
        let by = match by {
            Some(by) => by,
            None => return,
        };

        if let Some(previous) = previous.filter(|p| p.id != by.id) {
            crate::log_info!(
                "COLLAB",
                "{} ({}) overwrote {} last written by {} ({})",
                by.name,
                by.id,
                key,
                previous.name,
                previous.id
            );
            overwritten.push(Overwrite {
                cell: key,
                previous_editor: previous.name,
                by: by.name.clone(),
            });
        }
        if keeps_content {
            self.editors.insert(key, by.clone());
        }
    }

    /// The last editor recorded for a cell.
    pub fn last_editor(&self, key: CellKey) -> Option<&Editor> {
        self.editors.get(&key)
    }

    /// Inserts the edges of a formula cell, or blocks it when they would
    /// close a cycle. Returns false when blocked.
    fn link_formula(&mut self, key: CellKey) -> bool {
        let deps = match self
            .get_cell(key.sheet, key.row, key.col)
            .and_then(|c| c.ast.as_ref())
        {
            Some(ast) => extract_dependencies(ast, key.sheet, &*self),
            None => {
                self.graph.remove_formula(key);
                self.blocked.remove(&key);
                return true;
            }
        };

        if self.graph.would_create_cycle(key, &deps) {
            self.graph.register_formula(key);
            if self.blocked.insert(key) {
                crate::log_warn!("RECALC", "circular reference at {}", key);
            }
            false
        } else {
            self.graph.set_dependencies(key, deps);
            self.blocked.remove(&key);
            true
        }
    }

    /// Reads a rectangle. Positions without content come back empty; the
    /// sheet must exist but coordinates are never out of range.
    pub fn get_range(
        &self,
        sheet: u32,
        start: CellCoord,
        end: CellCoord,
    ) -> EngineResult<Vec<Vec<CellSnapshot>>> {
        let grid = &self.check_sheet(sheet)?.grid;
        let range = CellRange::new(sheet, start, end);
        let stale = self.stale_cells();

        Ok((range.start_row..=range.end_row)
            .map(|row| {
                (range.start_col..=range.end_col)
                    .map(|col| match grid.get_cell(row, col) {
                        Some(cell) => CellSnapshot {
                            value: cell.value.clone(),
                            formula: cell.formula.clone(),
                            stale: stale.contains(&CellKey::new(sheet, row, col)),
                        },
                        None => CellSnapshot::default(),
                    })
                    .collect()
            })
            .collect())
    }

    /// Resolves an A1-style reference ("B2:D10", "Data!A:C") to a rectangle.
    pub fn parse_range(&self, reference: &str, current_sheet: u32) -> EngineResult<CellRange> {
        self.check_sheet(current_sheet)?;
        let invalid = || EngineError::InvalidRange(reference.to_string());
        let expr = Parser::new(reference)
            .parse_expression_only()
            .map_err(|_| invalid())?;
        resolve_range(&expr, current_sheet, self).map_err(|_| invalid())
    }

    /// Evaluates a formula against the current values without storing it.
    /// The leading `=` is optional.
    pub fn evaluate_formula(&self, sheet: u32, formula: &str) -> EngineResult<CellValue> {
        self.check_sheet(sheet)?;
        let ast = if formula.starts_with(FORMULA_MARKER) {
            parse(formula)?
        } else {
            Parser::new(formula).parse_expression_only()?
        };
        Ok(Evaluator::new(self, sheet).evaluate(&ast).to_cell_value())
    }

    // ========================================================================
    // VARIABLES
    // ========================================================================

    /// Sets a workbook variable. Formulas reading it are recalculated.
    pub fn set_variable(&mut self, name: &str, value: CellValue) -> EngineResult<RecalcReport> {
        let key = Self::variable_key(name)?;
        crate::log_debug!("WORKBOOK", "variable {} = {:?}", key, value);
        let readers = self.graph.dependents_of_name(&key);
        self.variables.insert(key, value);
        Ok(self.commit_variable_change(readers))
    }

    /// Removes a workbook variable. Formulas reading it turn into #NAME?.
    pub fn remove_variable(&mut self, name: &str) -> EngineResult<RecalcReport> {
        let key = Self::variable_key(name)?;
        if self.variables.remove(&key).is_none() {
            return Ok(RecalcReport::default());
        }
        let readers = self.graph.dependents_of_name(&key);
        Ok(self.commit_variable_change(readers))
    }

    pub fn variable(&self, name: &str) -> Option<&CellValue> {
        self.variables.get(&name.to_uppercase())
    }

    pub fn variables(&self) -> &BTreeMap<String, CellValue> {
        &self.variables
    }

    /// Upper-cased variable key. The name must parse as a bare name, so it
    /// cannot be mistaken for a cell reference or a function.
    fn variable_key(name: &str) -> EngineResult<String> {
        match Parser::new(name).parse_expression_only() {
            Ok(Expression::Name(n)) => Ok(n.to_uppercase()),
            _ => Err(EngineError::InvalidName(name.to_string())),
        }
    }

    fn commit_variable_change(&mut self, readers: BTreeSet<CellKey>) -> RecalcReport {
        self.revision += 1;
        self.dirty.extend(readers);
        self.recalculate_if_automatic()
    }

    // ========================================================================
    // CALCULATION
    // ========================================================================

    pub fn calculation_mode(&self) -> CalculationMode {
        self.mode
    }

    /// Switches the calculation mode. Returning to automatic recalculates
    /// whatever went stale in the meantime.
    pub fn set_calculation_mode(&mut self, mode: CalculationMode) -> RecalcReport {
        crate::log_info!("RECALC", "calculation mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.recalculate_if_automatic()
    }

    /// Recalculates every dirty cell and its dependents in one pass.
    pub fn calculate_now(&mut self) -> RecalcReport {
        let seeds = std::mem::take(&mut self.dirty);
        self.recalculate(seeds)
    }

    fn recalculate_if_automatic(&mut self) -> RecalcReport {
        match self.mode {
            CalculationMode::Automatic => self.calculate_now(),
            CalculationMode::Manual => RecalcReport::default(),
        }
    }

    /// Cells whose displayed value may be out of date: dirty formula cells
    /// and everything downstream of a dirty cell.
    pub fn stale_cells(&self) -> BTreeSet<CellKey> {
        if self.dirty.is_empty() {
            return BTreeSet::new();
        }
        self.affected_by(self.dirty.iter().copied())
    }

    pub fn is_stale(&self, key: CellKey) -> bool {
        self.stale_cells().contains(&key)
    }

    /// Cells currently blocked by a circular reference.
    pub fn circular_cells(&self) -> Vec<CellKey> {
        self.blocked.iter().copied().collect()
    }

    /// Rebuilds every dependency edge from the stored formulas and runs one
    /// topological pass over all of them.
    pub fn rebuild_all(&mut self) -> RecalcReport {
        crate::log_enter!("RECALC", "rebuild_all");
        self.graph.clear();
        self.blocked.clear();
        self.dirty.clear();

        let formulas: Vec<CellKey> = self
            .sheets
            .iter()
            .enumerate()
            .flat_map(|(i, sheet)| {
                sheet
                    .grid
                    .formula_coords()
                    .into_iter()
                    .map(move |(row, col)| CellKey::new(i as u32, row, col))
            })
            .collect();

        for &key in &formulas {
            self.graph.register_formula(key);
        }
        for &key in &formulas {
            self.link_formula(key);
        }

        let report = self.recalculate(formulas);
        crate::log_exit!("RECALC", "rebuild_all", "evaluated={}", report.recalculated.len());
        report
    }
}

impl SheetLookup for Workbook {
    fn sheet_index(&self, name: &str) -> Option<u32> {
        self.sheets
            .iter()
            .position(|s| s.name.eq_ignore_ascii_case(name))
            .map(|i| i as u32)
    }
}

impl CellSource for Workbook {
    fn cell_value(&self, key: CellKey) -> Option<&CellValue> {
        self.get_cell(key.sheet, key.row, key.col).map(|c| &c.value)
    }

    fn sheet_extent(&self, sheet: u32) -> Option<(u32, u32)> {
        self.sheets
            .get(sheet as usize)
            .map(|s| (s.grid.max_row, s.grid.max_col))
    }

    fn variable(&self, name: &str) -> Option<&CellValue> {
        self.variables.get(name)
    }
}
