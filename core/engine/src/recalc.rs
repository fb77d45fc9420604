//! FILENAME: core/engine/src/recalc.rs
//! PURPOSE: The recalculation pass over a workbook.
//! CONTEXT: Given the cells that changed, this module collects every formula
//! that can observe the change, orders them with the dependency graph and
//! evaluates them one by one, writing each result back before the next cell
//! reads it. Cells whose edges were rejected because of a cycle evaluate to
//! #CIRCULAR! and their dependents pick the error up through propagation.

use crate::cell::{CellError, CellValue};
use crate::coord::CellKey;
use crate::evaluator::Evaluator;
use crate::workbook::Workbook;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// When formulas are recalculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMode {
    /// Every edit recalculates before returning.
    #[default]
    Automatic,
    /// Edits only mark cells dirty until `calculate_now`.
    Manual,
}

impl CalculationMode {
    pub fn parse(mode: &str) -> Option<CalculationMode> {
        match mode.to_lowercase().as_str() {
            "automatic" | "auto" => Some(CalculationMode::Automatic),
            "manual" => Some(CalculationMode::Manual),
            _ => None,
        }
    }
}

/// What a recalculation pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecalcReport {
    /// Formula cells evaluated, in evaluation order.
    pub recalculated: Vec<CellKey>,
    /// Cells that ended the pass as #CIRCULAR!, either blocked themselves or
    /// reading a blocked cell.
    pub circular: Vec<CellKey>,
}

impl RecalcReport {
    pub fn is_empty(&self) -> bool {
        self.recalculated.is_empty()
    }

    /// Appends another pass to this one.
    pub fn merge(&mut self, other: RecalcReport) {
        self.recalculated.extend(other.recalculated);
        self.circular.extend(other.circular);
    }
}

impl Workbook {
    /// Formula cells affected by a change to `seeds`: the seeds that are
    /// formulas themselves plus everything downstream of any seed.
    pub(crate) fn affected_by<I>(&self, seeds: I) -> BTreeSet<CellKey>
    where
        I: IntoIterator<Item = CellKey>,
    {
        let seeds: Vec<CellKey> = seeds.into_iter().collect();
        let mut affected = self.graph.transitive_dependents(seeds.iter().copied());
        affected.extend(seeds.into_iter().filter(|k| self.graph.is_formula(*k)));
        affected
    }

    /// Re-evaluates everything affected by `seeds` in dependency order.
    pub(crate) fn recalculate<I>(&mut self, seeds: I) -> RecalcReport
    where
        I: IntoIterator<Item = CellKey>,
    {
        let affected = self.affected_by(seeds);
        let mut report = RecalcReport::default();
        if affected.is_empty() {
            return report;
        }

        crate::log_enter!("RECALC", "recalculate", "cells={}", affected.len());

        let order = match self.graph.topological_order(&affected) {
            Ok(order) => order,
            Err(cycle) => {
                // Rejected edges keep the graph acyclic; reaching this means the
                // graph and the blocked set disagree. Quarantine what is left.
                crate::log_error!("RECALC", "{}", cycle);
                for &key in &cycle.cycle_cells {
                    self.write_value(key, CellValue::Error(CellError::Circular));
                    report.circular.push(key);
                }
                let stuck: BTreeSet<CellKey> = cycle.cycle_cells.iter().copied().collect();
                let rest: BTreeSet<CellKey> = affected.difference(&stuck).copied().collect();
                self.graph
                    .topological_order(&rest)
                    .unwrap_or_else(|_| rest.into_iter().collect())
            }
        };

        for key in order {
            let value = self.evaluate_cell(key);
            if value == CellValue::Error(CellError::Circular) {
                report.circular.push(key);
            }
            self.write_value(key, value);
            report.recalculated.push(key);
        }

        crate::log_exit!(
            "RECALC",
            "recalculate",
            "evaluated={} circular={}",
            report.recalculated.len(),
            report.circular.len()
        );
        report
    }

    /// Evaluates one formula cell against the current values.
    fn evaluate_cell(&self, key: CellKey) -> CellValue {
        if self.blocked.contains(&key) {
            return CellValue::Error(CellError::Circular);
        }
        let ast = match self.get_cell(key.sheet, key.row, key.col).and_then(|c| c.ast.as_ref()) {
            Some(ast) => ast,
            None => return CellValue::Empty,
        };
        Evaluator::new(self, key.sheet).evaluate(ast).to_cell_value()
    }

    fn write_value(&mut self, key: CellKey, value: CellValue) {
        if let Some(cell) = self
            .sheets
            .get_mut(key.sheet as usize)
            .and_then(|s| s.grid.get_cell_mut(key.row, key.col))
        {
            cell.value = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!(CalculationMode::parse("Manual"), Some(CalculationMode::Manual));
        assert_eq!(CalculationMode::parse("auto"), Some(CalculationMode::Automatic));
        assert_eq!(CalculationMode::parse("sometimes"), None);
        assert_eq!(CalculationMode::default(), CalculationMode::Automatic);
    }

    #[test]
    fn reports_merge() {
        let mut a = RecalcReport {
            recalculated: vec![CellKey::new(0, 0, 0)],
            circular: vec![],
        };
        a.merge(RecalcReport {
            recalculated: vec![CellKey::new(0, 1, 0)],
            circular: vec![CellKey::new(0, 1, 0)],
        });
        assert_eq!(a.recalculated.len(), 2);
        assert_eq!(a.circular, vec![CellKey::new(0, 1, 0)]);
    }
}
