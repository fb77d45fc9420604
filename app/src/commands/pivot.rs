//! FILENAME: app/src/commands/pivot.rs
//! PURPOSE: Commands for Pivot Table operations.
//! CONTEXT: Requests address source and destination in A1 notation; they
//! are resolved against the workbook before reaching the registry.

use super::publish_pivot_writes;
use crate::api_types::{PivotRequest, PivotViewResponse};
use crate::error::{ServiceError, ServiceResult};
use crate::{read, write, AppState, Spreadsheet, SpreadsheetId};
use engine::{CellKey, Workbook};
use pivot_engine::{PivotDefinition, PivotError, PivotId};

fn to_definition(workbook: &Workbook, request: &PivotRequest) -> ServiceResult<PivotDefinition> {
    let source = workbook.parse_range(&request.source_range, request.source_sheet)?;

    let destination = match &request.destination_cell {
        None => None,
        Some(cell) => {
            let sheet = request.destination_sheet.unwrap_or(source.sheet);
            let target = workbook.parse_range(cell, sheet)?;
            if target.cell_count() != 1 {
                return Err(ServiceError::InvalidInput(format!(
                    "destination '{}' must be a single cell",
                    cell
                )));
            }
            Some(CellKey::new(target.sheet, target.start_row, target.start_col))
        }
    };

    Ok(PivotDefinition {
        source,
        group_by: request.group_by.clone(),
        measures: request.measures.clone(),
        destination,
    })
}

fn response(doc: &Spreadsheet, pivot_id: PivotId) -> ServiceResult<PivotViewResponse> {
    doc.pivots
        .get(pivot_id)
        .map(PivotViewResponse::from)
        .ok_or_else(|| PivotError::NotFound(pivot_id).into())
}

// ============================================================================
// COMMANDS
// ============================================================================

/// Creates a new pivot table from the specified source range
pub fn create_pivot(
    state: &AppState,
    id: SpreadsheetId,
    request: PivotRequest,
) -> ServiceResult<PivotViewResponse> {
    engine::log_info!(
        "PIVOT",
        "create_pivot source={} dest={:?}",
        request.source_range,
        request.destination_cell
    );
    let handle = state.handle(id)?;
    let (result, writes) = {
        let mut doc = write(&handle);
        let definition = to_definition(&doc.workbook, &request)?;
        let doc = &mut *doc;
        let view = doc.pivots.create(&mut doc.workbook, definition)?;
        (response(doc, view.pivot_id)?, doc.pivots.take_writes())
    };
    publish_pivot_writes(state, id, writes);
    Ok(result)
}

/// Replaces a pivot's configuration; the id stays the same.
pub fn update_pivot(
    state: &AppState,
    id: SpreadsheetId,
    pivot_id: PivotId,
    request: PivotRequest,
) -> ServiceResult<PivotViewResponse> {
    let handle = state.handle(id)?;
    let (result, writes) = {
        let mut doc = write(&handle);
        let definition = to_definition(&doc.workbook, &request)?;
        let doc = &mut *doc;
        doc.pivots.update(pivot_id, &mut doc.workbook, definition)?;
        (response(doc, pivot_id)?, doc.pivots.take_writes())
    };
    publish_pivot_writes(state, id, writes);
    Ok(result)
}

pub fn delete_pivot(state: &AppState, id: SpreadsheetId, pivot_id: PivotId) -> ServiceResult<()> {
    let handle = state.handle(id)?;
    let writes = {
        let mut doc = write(&handle);
        let doc = &mut *doc;
        doc.pivots.delete(pivot_id, &mut doc.workbook)?;
        doc.pivots.take_writes()
    };
    publish_pivot_writes(state, id, writes);
    Ok(())
}

pub fn refresh_pivot(
    state: &AppState,
    id: SpreadsheetId,
    pivot_id: PivotId,
) -> ServiceResult<PivotViewResponse> {
    let handle = state.handle(id)?;
    let (result, writes) = {
        let mut doc = write(&handle);
        let doc = &mut *doc;
        doc.pivots.refresh(pivot_id, &mut doc.workbook)?;
        (response(doc, pivot_id)?, doc.pivots.take_writes())
    };
    publish_pivot_writes(state, id, writes);
    Ok(result)
}

/// The cached result; does not recalculate.
pub fn get_pivot(
    state: &AppState,
    id: SpreadsheetId,
    pivot_id: PivotId,
) -> ServiceResult<PivotViewResponse> {
    let handle = state.handle(id)?;
    let doc = read(&handle);
    response(&doc, pivot_id)
}

pub fn list_pivots(state: &AppState, id: SpreadsheetId) -> ServiceResult<Vec<PivotViewResponse>> {
    let handle = state.handle(id)?;
    let doc = read(&handle);
    Ok(doc.pivots.list().into_iter().map(PivotViewResponse::from).collect())
}
