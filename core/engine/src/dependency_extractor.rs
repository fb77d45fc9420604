//! FILENAME: core/engine/src/dependency_extractor.rs
//! PURPOSE: Extracts cell references from parsed AST expressions.
//! CONTEXT: After a formula is parsed into an AST, this module walks the tree
//! to find everything the formula reads. These references are then used to
//! build the dependency graph. Single cells are collected as keys; ranges,
//! whole columns and whole rows stay as rectangles so that `A:A` does not
//! explode into a million edges. Workbook variables are collected by name.

use crate::cell::CellError;
use crate::coord::{a1_to_coord, col_to_index, CellKey, CellRange};
use parser::Expression;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Resolves sheet names written in formulas to sheet indices.
pub trait SheetLookup {
    /// Case-insensitive lookup of a sheet by name.
    fn sheet_index(&self, name: &str) -> Option<u32>;
}

/// Everything a formula reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dependencies {
    pub cells: BTreeSet<CellKey>,
    pub ranges: SmallVec<[CellRange; 2]>,
    /// Upper-cased variable names.
    pub names: BTreeSet<String>,
}

impl Dependencies {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty() && self.ranges.is_empty() && self.names.is_empty()
    }

    /// True if any cell or range precedent covers `key`.
    pub fn reads(&self, key: CellKey) -> bool {
        self.cells.contains(&key) || self.ranges.iter().any(|r| r.contains(key))
    }
}

/// Resolves a single-cell reference. Unknown sheets and unusable coordinates
/// resolve to `#REF!`.
pub fn resolve_cell<S: SheetLookup + ?Sized>(
    sheet: &Option<String>,
    col: &str,
    row: u32,
    current_sheet: u32,
    sheets: &S,
) -> Result<CellKey, CellError> {
    let sheet_idx = resolve_sheet(sheet, current_sheet, sheets)?;
    let (r, c) = a1_to_coord(col, row).ok_or(CellError::Ref)?;
    Ok(CellKey::new(sheet_idx, r, c))
}

/// Resolves a Range, ColumnRef or RowRef node to a rectangle.
/// Whole columns and rows extend to the maximum index.
pub fn resolve_range<S: SheetLookup + ?Sized>(
    expr: &Expression,
    current_sheet: u32,
    sheets: &S,
) -> Result<CellRange, CellError> {
    match expr {
        Expression::Range { sheet, start, end } => {
            let sheet_idx = resolve_sheet(sheet, current_sheet, sheets)?;
            let a = corner(start)?;
            let b = corner(end)?;
            Ok(CellRange::new(sheet_idx, a, b))
        }
        Expression::ColumnRef {
            sheet,
            start_col,
            end_col,
            ..
        } => {
            let sheet_idx = resolve_sheet(sheet, current_sheet, sheets)?;
            let start = col_to_index(start_col).ok_or(CellError::Ref)?;
            let end = col_to_index(end_col).ok_or(CellError::Ref)?;
            Ok(CellRange::new(sheet_idx, (0, start), (u32::MAX, end)))
        }
        Expression::RowRef {
            sheet,
            start_row,
            end_row,
            ..
        } => {
            let sheet_idx = resolve_sheet(sheet, current_sheet, sheets)?;
            let start = start_row.checked_sub(1).ok_or(CellError::Ref)?;
            let end = end_row.checked_sub(1).ok_or(CellError::Ref)?;
            Ok(CellRange::new(sheet_idx, (start, 0), (end, u32::MAX)))
        }
        Expression::CellRef {
            sheet, col, row, ..
        } => {
            let key = resolve_cell(sheet, col, *row, current_sheet, sheets)?;
            Ok(CellRange::single(key))
        }
        _ => Err(CellError::Ref),
    }
}

fn resolve_sheet<S: SheetLookup + ?Sized>(
    sheet: &Option<String>,
    current_sheet: u32,
    sheets: &S,
) -> Result<u32, CellError> {
    match sheet {
        Some(name) => sheets.sheet_index(name).ok_or(CellError::Ref),
        None => Ok(current_sheet),
    }
}

fn corner(expr: &Expression) -> Result<(u32, u32), CellError> {
    match expr {
        Expression::CellRef { col, row, .. } => a1_to_coord(col, *row).ok_or(CellError::Ref),
        _ => Err(CellError::Ref),
    }
}

/// Extracts all dependencies from an AST expression.
/// References that cannot be resolved (unknown sheet) contribute nothing;
/// they evaluate to `#REF!` and are re-extracted when sheets are added.
pub fn extract_dependencies<S: SheetLookup + ?Sized>(
    expr: &Expression,
    current_sheet: u32,
    sheets: &S,
) -> Dependencies {
    let mut deps = Dependencies::default();
    extract_recursive(expr, current_sheet, sheets, &mut deps);
    deps
}

/// Recursive helper for dependency extraction.
fn extract_recursive<S: SheetLookup + ?Sized>(
    expr: &Expression,
    current_sheet: u32,
    sheets: &S,
    deps: &mut Dependencies,
) {
    match expr {
        Expression::Literal(_) => {}

        Expression::CellRef {
            sheet, col, row, ..
        } => {
            if let Ok(key) = resolve_cell(sheet, col, *row, current_sheet, sheets) {
                deps.cells.insert(key);
            }
        }

        Expression::Range { .. } | Expression::ColumnRef { .. } | Expression::RowRef { .. } => {
            if let Ok(range) = resolve_range(expr, current_sheet, sheets) {
                if range.cell_count() == 1 {
                    deps.cells
                        .insert(CellKey::new(range.sheet, range.start_row, range.start_col));
                } else if !deps.ranges.contains(&range) {
                    deps.ranges.push(range);
                }
            }
        }

        Expression::Name(name) => {
            deps.names.insert(name.to_uppercase());
        }

        Expression::BinaryOp { left, right, .. } => {
            extract_recursive(left, current_sheet, sheets, deps);
            extract_recursive(right, current_sheet, sheets, deps);
        }

        Expression::UnaryOp { operand, .. } => {
            extract_recursive(operand, current_sheet, sheets, deps);
        }

        Expression::FunctionCall { args, .. } => {
            for arg in args {
                extract_recursive(arg, current_sheet, sheets, deps);
            }
        }
    }
}
