//! FILENAME: core/engine/src/coord.rs
//! PURPOSE: Cell addressing: A1 conversions, workbook-wide cell keys and ranges.
//! CONTEXT: This module provides functions to convert between A1-style notation
//! (e.g., "A1", "AA100") and 0-based (row, col) numeric indices used internally.
//! Column "A" = 0, "B" = 1, ..., "Z" = 25, "AA" = 26, etc.
//! Row 1 in A1 notation = row 0 internally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate as (row, col) with 0-based indices.
pub type CellCoord = (u32, u32);

/// Identifies one cell anywhere in a workbook.
/// The derived ordering (sheet, row, col) is the recalculation tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub sheet: u32,
    pub row: u32,
    pub col: u32,
}

impl CellKey {
    pub fn new(sheet: u32, row: u32, col: u32) -> Self {
        CellKey { sheet, row, col }
    }

    pub fn coord(&self) -> CellCoord {
        (self.row, self.col)
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, coord_to_a1(self.coord()))
    }
}

/// An inclusive rectangle of cells on one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub sheet: u32,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl CellRange {
    /// Builds a range from two corners in any order.
    pub fn new(sheet: u32, a: CellCoord, b: CellCoord) -> Self {
        CellRange {
            sheet,
            start_row: a.0.min(b.0),
            start_col: a.1.min(b.1),
            end_row: a.0.max(b.0),
            end_col: a.1.max(b.1),
        }
    }

    pub fn single(key: CellKey) -> Self {
        CellRange::new(key.sheet, key.coord(), key.coord())
    }

    pub fn rows(&self) -> u64 {
        (self.end_row - self.start_row) as u64 + 1
    }

    pub fn cols(&self) -> u64 {
        (self.end_col - self.start_col) as u64 + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.rows() * self.cols()
    }

    pub fn contains(&self, key: CellKey) -> bool {
        key.sheet == self.sheet
            && key.row >= self.start_row
            && key.row <= self.end_row
            && key.col >= self.start_col
            && key.col <= self.end_col
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.sheet == other.sheet
            && self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }

    /// Iterates the keys of the range in row-major order.
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        (self.start_row..=self.end_row).flat_map(move |row| {
            (self.start_col..=self.end_col).map(move |col| CellKey::new(self.sheet, row, col))
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}:{}",
            self.sheet,
            coord_to_a1((self.start_row, self.start_col)),
            coord_to_a1((self.end_row, self.end_col))
        )
    }
}

/// Converts a column string (e.g., "A", "AA", "ABC") to a 0-based column index.
/// "A" -> 0, "B" -> 1, ..., "Z" -> 25, "AA" -> 26, "AB" -> 27, etc.
/// Returns None for empty or non-alphabetic input, or when the index overflows u32.
pub fn col_to_index(col_str: &str) -> Option<u32> {
    if col_str.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for c in col_str.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result - 1) // Convert to 0-based
}

/// Converts a 0-based column index to a column string.
/// 0 -> "A", 1 -> "B", ..., 25 -> "Z", 26 -> "AA", 27 -> "AB", etc.
pub fn index_to_col(mut col_index: u32) -> String {
    let mut result = String::new();
    loop {
        let remainder = col_index % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if col_index < 26 {
            break;
        }
        col_index = col_index / 26 - 1;
    }
    result
}

/// Converts an A1-style reference to a 0-based (row, col) coordinate.
/// "A1" -> (0, 0), "B2" -> (1, 1), "AA100" -> (99, 26)
pub fn a1_to_coord(col_str: &str, row_num: u32) -> Option<CellCoord> {
    let col = col_to_index(col_str)?;
    let row = row_num.checked_sub(1)?; // Convert 1-based to 0-based
    Some((row, col))
}

/// Converts a 0-based (row, col) coordinate to an A1-style reference string.
/// (0, 0) -> "A1", (1, 1) -> "B2", (99, 26) -> "AA100"
pub fn coord_to_a1(coord: CellCoord) -> String {
    let (row, col) = coord;
    format!("{}{}", index_to_col(col), row as u64 + 1)
}

/// Parses a plain A1 reference such as "B7" (no sheet, `$` allowed).
pub fn parse_a1(reference: &str) -> Option<CellCoord> {
    let cleaned: String = reference.chars().filter(|c| *c != '$').collect();
    let split = cleaned.find(|c: char| c.is_ascii_digit())?;
    let (col, row) = cleaned.split_at(split);
    a1_to_coord(col, row.parse().ok()?)
}
