//! FILENAME: core/pivot-engine/src/registry.rs
//! Pivot Registry - The pivot tables of one workbook.
//!
//! Owns each pivot's definition and last calculated view. When a pivot has
//! a destination, every calculation writes the grid into the workbook as
//! literal cells in one batch, clearing cells of the previous output that
//! the new grid no longer covers. Cells changed by those writes, including
//! recalculated dependents, are collected until `take_writes` drains them.

use crate::definition::{PivotDefinition, PivotId};
use crate::engine::calculate_pivot;
use crate::error::{PivotError, PivotResult, ValidationError};
use crate::view::PivotView;
use engine::{CellContent, CellKey, CellRange, EditOutcome, EngineError, Workbook};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A registered pivot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub id: PivotId,
    pub definition: PivotDefinition,
    pub view: PivotView,
    /// Cells written at the destination by the last calculation.
    pub output: Option<CellRange>,
}

/// Workbook cells changed by pivot output since the last drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotWrites {
    /// Workbook revision after the latest write.
    pub revision: u64,
    /// Ascending.
    pub changed: Vec<CellKey>,
}

#[derive(Debug, Clone)]
pub struct PivotRegistry {
    pivots: BTreeMap<PivotId, PivotTable>,
    next_id: PivotId,
    written: BTreeSet<CellKey>,
    written_revision: Option<u64>,
}

impl Default for PivotRegistry {
    fn default() -> Self {
        PivotRegistry::new()
    }
}

impl PivotRegistry {
    pub fn new() -> Self {
        PivotRegistry {
            pivots: BTreeMap::new(),
            next_id: 1,
            written: BTreeSet::new(),
            written_revision: None,
        }
    }

    /// Creates a pivot and calculates it. Ids are never reused.
    pub fn create(
        &mut self,
        workbook: &mut Workbook,
        definition: PivotDefinition,
    ) -> PivotResult<PivotView> {
        let id = self.next_id;
        let (table, outcome) = build(id, definition, workbook, None)?;
        self.next_id += 1;
        self.record(outcome);

        engine::log_info!(
            "PIVOT",
            "created pivot {} over {} ({} groups)",
            id,
            table.definition.source,
            table.view.data_rows().len()
        );
        let view = table.view.clone();
        self.pivots.insert(id, table);
        Ok(view)
    }

    /// Replaces a pivot's definition, keeping its id. On failure the
    /// previous pivot stays as it was.
    pub fn update(
        &mut self,
        id: PivotId,
        workbook: &mut Workbook,
        definition: PivotDefinition,
    ) -> PivotResult<PivotView> {
        let previous = self.pivots.get(&id).ok_or(PivotError::NotFound(id))?.output;
        let (table, outcome) = build(id, definition, workbook, previous)?;
        self.record(outcome);

        engine::log_info!("PIVOT", "updated pivot {}", id);
        let view = table.view.clone();
        self.pivots.insert(id, table);
        Ok(view)
    }

    /// Removes a pivot and clears its destination output.
    pub fn delete(&mut self, id: PivotId, workbook: &mut Workbook) -> PivotResult<()> {
        let table = self.pivots.remove(&id).ok_or(PivotError::NotFound(id))?;
        if let Some(output) = table.output {
            let clears: Vec<_> = output.keys().map(|k| (k, CellContent::Empty)).collect();
            let outcome = workbook.set_cells(clears, None)?;
            self.record(Some(outcome));
        }
        engine::log_info!("PIVOT", "deleted pivot {}", id);
        Ok(())
    }

    /// Re-reads the source and replaces the cached view.
    pub fn refresh(&mut self, id: PivotId, workbook: &mut Workbook) -> PivotResult<PivotView> {
        let existing = self.pivots.get(&id).ok_or(PivotError::NotFound(id))?;
        let (table, outcome) = build(id, existing.definition.clone(), workbook, existing.output)?;
        self.record(outcome);

        engine::log_info!("PIVOT", "refreshed pivot {}", id);
        let view = table.view.clone();
        self.pivots.insert(id, table);
        Ok(view)
    }

    /// Refreshes, in id order, every pivot whose source contains one of
    /// `changed`. A pivot that no longer calculates keeps its previous view.
    pub fn refresh_affected(
        &mut self,
        workbook: &mut Workbook,
        changed: &[CellKey],
    ) -> Vec<PivotView> {
        let ids: Vec<PivotId> = self
            .pivots
            .values()
            .filter(|t| changed.iter().any(|&k| t.definition.source.contains(k)))
            .map(|t| t.id)
            .collect();

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            match self.refresh(id, workbook) {
                Ok(view) => views.push(view),
                Err(e) => engine::log_warn!("PIVOT", "automatic refresh of pivot {} failed: {}", id, e),
            }
        }
        views
    }

    fn record(&mut self, outcome: Option<EditOutcome>) {
        if let Some(outcome) = outcome {
            self.written.extend(outcome.changed);
            self.written_revision = Some(outcome.revision);
        }
    }

    /// Drains the cells pivot output has changed since the last call.
    pub fn take_writes(&mut self) -> Option<PivotWrites> {
        let revision = self.written_revision.take()?;
        Some(PivotWrites {
            revision,
            changed: std::mem::take(&mut self.written).into_iter().collect(),
        })
    }

    pub fn get(&self, id: PivotId) -> Option<&PivotTable> {
        self.pivots.get(&id)
    }

    /// All pivots in id order.
    pub fn list(&self) -> Vec<&PivotTable> {
        self.pivots.values().collect()
    }

    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }
}

/// Calculates a pivot and writes its destination output. The outcome is
/// None when nothing had to be written.
fn build(
    id: PivotId,
    definition: PivotDefinition,
    workbook: &mut Workbook,
    previous_output: Option<CellRange>,
) -> PivotResult<(PivotTable, Option<EditOutcome>)> {
    let view = calculate_pivot(id, &definition, workbook)?;

    let output = match definition.destination {
        None => None,
        Some(anchor) => {
            if workbook.sheet(anchor.sheet).is_none() {
                return Err(EngineError::SheetOutOfRange {
                    index: anchor.sheet,
                    count: workbook.sheet_count(),
                }
                .into());
            }
            let footprint = view
                .footprint(anchor)
                .ok_or(ValidationError::DestinationOutOfBounds)?;
            if footprint.overlaps(&definition.source) {
                return Err(ValidationError::DestinationOverlapsSource {
                    output: footprint,
                    source_range: definition.source,
                }
                .into());
            }
            Some(footprint)
        }
    };

    let mut edits: Vec<(CellKey, CellContent)> = Vec::new();
    if let Some(previous) = previous_output {
        edits.extend(
            previous
                .keys()
                .filter(|k| !output.map_or(false, |o| o.contains(*k)))
                .map(|k| (k, CellContent::Empty)),
        );
    }
    if let Some(anchor) = definition.destination {
        edits.extend(view.to_edits(anchor));
    }
    let outcome = if edits.is_empty() {
        None
    } else {
        let outcome = workbook.set_cells(edits, None)?;
        engine::log_debug!(
            "PIVOT",
            "pivot {} wrote {} cells (revision {})",
            id,
            outcome.changed.len(),
            outcome.revision
        );
        Some(outcome)
    };

    let table = PivotTable {
        id,
        definition,
        view,
        output,
    };
    Ok((table, outcome))
}
