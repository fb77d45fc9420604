//! FILENAME: app/src/commands/data.rs
//! PURPOSE: Spreadsheet lifecycle, sheets, variables and cell reads/writes.

use super::{
    check_range_size, finish_recalc, publish_changes, publish_pivot_writes, snapshot_range,
};
use crate::api_types::{
    RangeRequest, RangeSnapshot, RecalcResponse, SpreadsheetInfo, UpdateCellsRequest,
    UpdateCellsResponse,
};
use crate::error::{ServiceError, ServiceResult};
use crate::{read, write, AppState, Spreadsheet, SpreadsheetId};
use collab::CollabError;
use engine::{CellContent, CellKey, CellRange, Editor, Workbook};
use pivot_engine::PivotRegistry;
use uuid::Uuid;

fn info(id: SpreadsheetId, workbook: &Workbook) -> SpreadsheetInfo {
    SpreadsheetInfo {
        id,
        name: workbook.name().to_string(),
        sheets: workbook.sheet_names(),
        revision: workbook.revision(),
        calculation_mode: workbook.calculation_mode(),
    }
}

// ============================================================================
// SPREADSHEETS
// ============================================================================

/// Creates an empty spreadsheet with one sheet, "Sheet1".
pub fn create_spreadsheet(state: &AppState, name: &str) -> ServiceResult<SpreadsheetInfo> {
    engine::log_enter!("CMD", "create_spreadsheet", "name={}", name);

    let mut workbook = Workbook::new(name);
    workbook.set_calculation_mode(state.config.calculation_mode);
    let id = Uuid::new_v4();
    let result = info(id, &workbook);

    state.insert_spreadsheet(
        id,
        Spreadsheet {
            workbook,
            pivots: PivotRegistry::new(),
        },
    );

    engine::log_info!("CMD", "created spreadsheet {} '{}'", id, name);
    Ok(result)
}

pub fn get_spreadsheet(state: &AppState, id: SpreadsheetId) -> ServiceResult<SpreadsheetInfo> {
    let handle = state.handle(id)?;
    let doc = read(&handle);
    Ok(info(id, &doc.workbook))
}

/// Drops the spreadsheet and ends its collaboration session.
pub fn close_spreadsheet(state: &AppState, id: SpreadsheetId) -> ServiceResult<()> {
    state
        .remove_spreadsheet(id)
        .ok_or(ServiceError::SpreadsheetNotFound(id))?;
    state.sessions().close(id);
    engine::log_info!("CMD", "closed spreadsheet {}", id);
    Ok(())
}

pub fn add_sheet(state: &AppState, id: SpreadsheetId, name: &str) -> ServiceResult<u32> {
    engine::log_enter!("CMD", "add_sheet", "id={} name={}", id, name);
    let handle = state.handle(id)?;
    let mut doc = write(&handle);
    let index = doc.workbook.add_sheet(name)?;
    Ok(index)
}

// ============================================================================
// VARIABLES
// ============================================================================

/// Sets a workbook variable from raw input ("0.2", "TRUE", "text").
/// Formulas are not accepted as variable values.
pub fn set_variable(
    state: &AppState,
    id: SpreadsheetId,
    name: &str,
    value: &str,
) -> ServiceResult<RecalcResponse> {
    engine::log_enter!("CMD", "set_variable", "id={} name={}", id, name);
    let value = match CellContent::from_input(value) {
        CellContent::Value(v) => v,
        CellContent::Empty => engine::CellValue::Empty,
        CellContent::Formula(_) => {
            return Err(ServiceError::InvalidInput(
                "a variable value cannot be a formula".to_string(),
            ))
        }
    };

    let handle = state.handle(id)?;
    let (response, changed, revision) = {
        let mut doc = write(&handle);
        let report = doc.workbook.set_variable(name, value)?;
        let (response, changed) = finish_recalc(&mut doc, report);
        (response, changed, doc.workbook.revision())
    };
    publish_changes(state, id, revision, None, changed, &[]);
    Ok(response)
}

pub fn remove_variable(
    state: &AppState,
    id: SpreadsheetId,
    name: &str,
) -> ServiceResult<RecalcResponse> {
    let handle = state.handle(id)?;
    let (response, changed, revision) = {
        let mut doc = write(&handle);
        let report = doc.workbook.remove_variable(name)?;
        let (response, changed) = finish_recalc(&mut doc, report);
        (response, changed, doc.workbook.revision())
    };
    publish_changes(state, id, revision, None, changed, &[]);
    Ok(response)
}

// ============================================================================
// CELLS
// ============================================================================

/// Writes a block of raw inputs as one batch, recalculates, refreshes the
/// pivots whose source changed and returns the written block.
pub fn update_cells(
    state: &AppState,
    id: SpreadsheetId,
    request: UpdateCellsRequest,
) -> ServiceResult<UpdateCellsResponse> {
    let rows = request.values.len();
    let cols = request.values.iter().map(Vec::len).max().unwrap_or(0);
    engine::log_enter!("CMD", "update_cells", "id={} rows={} cols={}", id, rows, cols);

    if rows == 0 || cols == 0 {
        return Err(ServiceError::InvalidInput("no values to write".to_string()));
    }
    let out_of_bounds = || ServiceError::InvalidInput("update runs past the last row or column".to_string());
    let end_row = u32::try_from(rows - 1)
        .ok()
        .and_then(|r| request.start_row.checked_add(r))
        .ok_or_else(out_of_bounds)?;
    let end_col = u32::try_from(cols - 1)
        .ok()
        .and_then(|c| request.start_col.checked_add(c))
        .ok_or_else(out_of_bounds)?;
    let range = CellRange::new(
        request.sheet_index,
        (request.start_row, request.start_col),
        (end_row, end_col),
    );
    check_range_size(state, &range)?;

    let editor = match request.participant {
        Some(participant) => {
            let sessions = state.sessions();
            let user = sessions
                .session(id)
                .and_then(|s| s.participant(participant))
                .map(|p| Editor::new(participant.to_string(), p.user.clone()))
                .ok_or(CollabError::UnknownParticipant(participant))?;
            Some(user)
        }
        None => None,
    };

    let mut edits = Vec::with_capacity(rows * cols);
    for (r, row) in request.values.iter().enumerate() {
        for (c, raw) in row.iter().enumerate() {
            let key = CellKey::new(
                request.sheet_index,
                request.start_row + r as u32,
                request.start_col + c as u32,
            );
            edits.push((key, CellContent::from_input(raw)));
        }
    }

    let handle = state.handle(id)?;
    let (outcome, refreshed, pivot_writes, snapshot) = {
        let mut doc = write(&handle);
        let outcome = doc.workbook.set_cells(edits, editor.as_ref())?;
        let doc = &mut *doc;
        let refreshed = doc.pivots.refresh_affected(&mut doc.workbook, &outcome.changed);
        let pivot_writes = doc.pivots.take_writes();
        let snapshot = snapshot_range(&doc.workbook, &range)?;
        (outcome, refreshed, pivot_writes, snapshot)
    };

    publish_changes(
        state,
        id,
        outcome.revision,
        editor.as_ref().map(|e| e.name.as_str()),
        outcome.changed.clone(),
        &outcome.overwritten,
    );
    publish_pivot_writes(state, id, pivot_writes);

    engine::log_exit!(
        "CMD",
        "update_cells",
        "revision={} changed={} pivots={}",
        outcome.revision,
        outcome.changed.len(),
        refreshed.len()
    );

    Ok(UpdateCellsResponse {
        revision: outcome.revision,
        range: snapshot,
        changed: outcome.changed,
        circular: outcome.report.circular,
        refreshed_pivots: refreshed.iter().map(|v| v.pivot_id).collect(),
    })
}

/// Reads a block of cells. Positions without content come back empty.
pub fn get_cell_range(
    state: &AppState,
    id: SpreadsheetId,
    request: RangeRequest,
) -> ServiceResult<RangeSnapshot> {
    let range = request.to_range();
    check_range_size(state, &range)?;
    let handle = state.handle(id)?;
    let doc = read(&handle);
    snapshot_range(&doc.workbook, &range)
}
