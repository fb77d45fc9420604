//! FILENAME: app/src/api_types.rs
//! PURPOSE: Request and response structs of the service operations.
//! CONTEXT: Everything here is serde-serializable with camelCase field names.

use collab::{Participant, ParticipantId, SessionId};
use engine::{CalculationMode, CellKey, CellRange, CellSnapshot, CellValue};
use pivot_engine::{FieldRef, MeasureField, PivotId, PivotTable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// SPREADSHEETS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadsheetInfo {
    pub id: Uuid,
    pub name: String,
    pub sheets: Vec<String>,
    pub revision: u64,
    pub calculation_mode: CalculationMode,
}

// ============================================================================
// CELLS
// ============================================================================

/// Cell data returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub row: u32,
    pub col: u32,
    pub display: String,
    pub value: CellValue,
    pub formula: Option<String>,
    /// Waiting for recalculation (manual mode only).
    #[serde(default)]
    pub stale: bool,
}

impl CellData {
    pub fn from_snapshot(row: u32, col: u32, snapshot: CellSnapshot) -> Self {
        CellData {
            row,
            col,
            display: snapshot.value.display_value(),
            value: snapshot.value,
            formula: snapshot.formula,
            stale: snapshot.stale,
        }
    }
}

/// Inclusive row/column bounds on one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeRequest {
    pub sheet_index: u32,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl RangeRequest {
    pub fn to_range(&self) -> CellRange {
        CellRange::new(
            self.sheet_index,
            (self.start_row, self.start_col),
            (self.end_row, self.end_col),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSnapshot {
    pub sheet_index: u32,
    pub start_row: u32,
    pub start_col: u32,
    /// Row-major; every position of the range is present.
    pub rows: Vec<Vec<CellData>>,
}

/// Input for batch cell updates: a block of raw inputs anchored at
/// (start_row, start_col). `=` starts a formula; an empty string clears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellsRequest {
    pub sheet_index: u32,
    pub start_row: u32,
    pub start_col: u32,
    pub values: Vec<Vec<String>>,
    /// Collaboration participant making the edit, for overwrite notices.
    #[serde(default)]
    pub participant: Option<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCellsResponse {
    pub revision: u64,
    /// The written block after recalculation.
    pub range: RangeSnapshot,
    /// Edited plus recalculated cells.
    pub changed: Vec<CellKey>,
    pub circular: Vec<CellKey>,
    pub refreshed_pivots: Vec<PivotId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalcResponse {
    pub recalculated: Vec<CellKey>,
    pub circular: Vec<CellKey>,
    pub refreshed_pivots: Vec<PivotId>,
}

// ============================================================================
// FORMULAS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaResult {
    pub value: CellValue,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaValidation {
    pub valid: bool,
    /// First problem found, if any.
    pub diagnostic: Option<String>,
    pub diagnostics: Vec<String>,
    pub position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    pub category: String,
    pub min_args: usize,
    pub max_args: Option<usize>,
}

// ============================================================================
// PIVOTS
// ============================================================================

/// Pivot configuration with A1-style addressing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotRequest {
    pub source_sheet: u32,
    /// e.g. "A1:D100", "Data!A:C".
    pub source_range: String,
    #[serde(default)]
    pub group_by: Vec<FieldRef>,
    #[serde(default)]
    pub measures: Vec<MeasureField>,
    /// Defaults to the source sheet.
    #[serde(default)]
    pub destination_sheet: Option<u32>,
    /// e.g. "H1". No destination when absent.
    #[serde(default)]
    pub destination_cell: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotViewResponse {
    pub pivot_id: PivotId,
    pub source: CellRange,
    pub destination: Option<CellRange>,
    pub label_columns: usize,
    /// Header row, then one row per group.
    pub rows: Vec<Vec<CellValue>>,
}

impl From<&PivotTable> for PivotViewResponse {
    fn from(table: &PivotTable) -> Self {
        PivotViewResponse {
            pivot_id: table.id,
            source: table.definition.source,
            destination: table.output,
            label_columns: table.view.label_columns,
            rows: table.view.rows.clone(),
        }
    }
}

// ============================================================================
// COLLABORATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub spreadsheet_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorInfo {
    pub participant_id: ParticipantId,
    pub user: String,
    pub cursor: Option<CellKey>,
    pub selection: Option<CellRange>,
    pub last_heartbeat: chrono::DateTime<chrono::Utc>,
}

impl From<Participant> for CollaboratorInfo {
    fn from(p: Participant) -> Self {
        CollaboratorInfo {
            participant_id: p.id,
            user: p.user,
            cursor: p.presence.cursor,
            selection: p.presence.selection,
            last_heartbeat: p.last_heartbeat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRequest {
    pub participant: ParticipantId,
    #[serde(default)]
    pub cursor: Option<CellKey>,
    #[serde(default)]
    pub selection: Option<CellRange>,
}
