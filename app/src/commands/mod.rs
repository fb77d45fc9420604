//! FILENAME: app/src/commands/mod.rs
//! PURPOSE: The service operations, grouped by area.

pub mod data;
pub mod formula;
pub mod pivot;
pub mod sessions;

pub use data::*;
pub use formula::*;
pub use pivot::*;
pub use sessions::*;

use crate::api_types::{CellData, RangeSnapshot, RecalcResponse};
use crate::error::{ServiceError, ServiceResult};
use crate::{AppState, Spreadsheet, SpreadsheetId};
use engine::{CellKey, CellRange, Overwrite, RecalcReport, Workbook};
use pivot_engine::PivotWrites;
use std::collections::BTreeSet;

/// Rejects ranges larger than the configured limit.
pub(crate) fn check_range_size(state: &AppState, range: &CellRange) -> ServiceResult<()> {
    let requested = range.cell_count();
    let limit = state.config.max_range_cells;
    if requested > limit {
        engine::log_warn!("CMD", "rejected range {} ({} cells)", range, requested);
        return Err(ServiceError::RangeTooLarge { requested, limit });
    }
    Ok(())
}

pub(crate) fn snapshot_range(workbook: &Workbook, range: &CellRange) -> ServiceResult<RangeSnapshot> {
    let grid = workbook.get_range(
        range.sheet,
        (range.start_row, range.start_col),
        (range.end_row, range.end_col),
    )?;
    let rows = grid
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, snapshot)| {
                    CellData::from_snapshot(
                        range.start_row + r as u32,
                        range.start_col + c as u32,
                        snapshot,
                    )
                })
                .collect()
        })
        .collect();
    Ok(RangeSnapshot {
        sheet_index: range.sheet,
        start_row: range.start_row,
        start_col: range.start_col,
        rows,
    })
}

/// Refreshes the pivots a recalculation touched. Also returns every cell to
/// announce: the recalculated ones plus anything pivot output rewrote.
pub(crate) fn finish_recalc(
    doc: &mut Spreadsheet,
    report: RecalcReport,
) -> (RecalcResponse, Vec<CellKey>) {
    let refreshed = doc
        .pivots
        .refresh_affected(&mut doc.workbook, &report.recalculated);

    let mut changed: BTreeSet<CellKey> = report.recalculated.iter().copied().collect();
    if let Some(writes) = doc.pivots.take_writes() {
        changed.extend(writes.changed);
    }

    let response = RecalcResponse {
        recalculated: report.recalculated,
        circular: report.circular,
        refreshed_pivots: refreshed.iter().map(|v| v.pivot_id).collect(),
    };
    (response, changed.into_iter().collect())
}

/// Announces cells rewritten by pivot output. They carry no editor.
pub(crate) fn publish_pivot_writes(state: &AppState, id: SpreadsheetId, writes: Option<PivotWrites>) {
    if let Some(writes) = writes {
        publish_changes(state, id, writes.revision, None, writes.changed, &[]);
    }
}

/// Tells the spreadsheet's session, if one is running, about committed
/// changes. Must be called without holding the spreadsheet lock.
pub(crate) fn publish_changes(
    state: &AppState,
    id: SpreadsheetId,
    revision: u64,
    editor: Option<&str>,
    changed: Vec<CellKey>,
    overwritten: &[Overwrite],
) {
    if changed.is_empty() && overwritten.is_empty() {
        return;
    }
    let sessions = state.sessions();
    if let Some(session) = sessions.session(id) {
        session.publish_overwrites(overwritten);
        session.publish_cells_updated(revision, editor, changed);
    }
}
