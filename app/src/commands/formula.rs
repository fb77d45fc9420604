//! FILENAME: app/src/commands/formula.rs
//! PURPOSE: Formula evaluation, validation and calculation mode commands.

use super::{finish_recalc, publish_changes};
use crate::api_types::{FormulaResult, FormulaValidation, FunctionInfo, RecalcResponse};
use crate::error::{ServiceError, ServiceResult};
use crate::{read, write, AppState, SpreadsheetId};
use engine::CalculationMode;

/// Evaluates a formula against the spreadsheet without storing it.
pub fn evaluate_formula(
    state: &AppState,
    id: SpreadsheetId,
    sheet_index: u32,
    formula: &str,
) -> ServiceResult<FormulaResult> {
    engine::log_enter!("CMD", "evaluate_formula", "id={} formula={}", id, formula);
    let handle = state.handle(id)?;
    let doc = read(&handle);
    let value = doc.workbook.evaluate_formula(sheet_index, formula)?;
    Ok(FormulaResult {
        display: value.display_value(),
        value,
    })
}

/// Checks syntax and function usage. Needs no spreadsheet.
pub fn validate_formula(formula: &str) -> FormulaValidation {
    let check = parser::validate(formula);
    FormulaValidation {
        valid: check.valid,
        diagnostic: check.diagnostics.first().cloned(),
        diagnostics: check.diagnostics,
        position: check.position,
    }
}

/// The function catalog, in catalog order.
pub fn list_functions() -> Vec<FunctionInfo> {
    parser::list_functions()
        .into_iter()
        .map(|sig| FunctionInfo {
            name: sig.name.to_string(),
            category: format!("{:?}", sig.category).to_lowercase(),
            min_args: sig.min_args,
            max_args: sig.max_args,
        })
        .collect()
}

// ============================================================================
// CALCULATION MODE
// ============================================================================

/// Sets "automatic" or "manual". Switching to automatic recalculates
/// everything that went stale.
pub fn set_calculation_mode(
    state: &AppState,
    id: SpreadsheetId,
    mode: &str,
) -> ServiceResult<RecalcResponse> {
    engine::log_enter!("CMD", "set_calculation_mode", "id={} mode={}", id, mode);
    let mode = CalculationMode::parse(mode)
        .ok_or_else(|| ServiceError::InvalidInput(format!("unknown calculation mode '{}'", mode)))?;

    let handle = state.handle(id)?;
    let (response, changed, revision) = {
        let mut doc = write(&handle);
        let report = doc.workbook.set_calculation_mode(mode);
        let (response, changed) = finish_recalc(&mut doc, report);
        (response, changed, doc.workbook.revision())
    };
    publish_changes(state, id, revision, None, changed, &[]);

    engine::log_exit!("CMD", "set_calculation_mode", "set to {:?}", mode);
    Ok(response)
}

/// Runs one recalculation pass over everything stale.
pub fn calculate_now(state: &AppState, id: SpreadsheetId) -> ServiceResult<RecalcResponse> {
    engine::log_enter!("CMD", "calculate_now", "id={}", id);
    let handle = state.handle(id)?;
    let (response, changed, revision) = {
        let mut doc = write(&handle);
        let report = doc.workbook.calculate_now();
        let (response, changed) = finish_recalc(&mut doc, report);
        (response, changed, doc.workbook.revision())
    };
    publish_changes(state, id, revision, None, changed, &[]);

    engine::log_exit!("CMD", "calculate_now", "{} cells", response.recalculated.len());
    Ok(response)
}
