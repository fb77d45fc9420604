//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - The calculated result grid.
//!
//! Row 0 holds the headers (group-by field names, then measure labels);
//! each following row is one group in first-seen order.

use crate::definition::PivotId;
use engine::{CellContent, CellKey, CellRange, CellValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotView {
    pub pivot_id: PivotId,

    /// Number of leading label columns (one per group-by field).
    pub label_columns: usize,

    /// Header row followed by one row per group.
    pub rows: Vec<Vec<CellValue>>,
}

impl PivotView {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn header(&self) -> &[CellValue] {
        self.rows.first().map_or(&[], |r| r.as_slice())
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    /// The rectangle this grid occupies when written at `anchor`, or None if
    /// it would run past the last addressable row or column.
    pub fn footprint(&self, anchor: CellKey) -> Option<CellRange> {
        let rows = u32::try_from(self.row_count()).ok()?;
        let cols = u32::try_from(self.col_count()).ok()?;
        if rows == 0 || cols == 0 {
            return Some(CellRange::single(anchor));
        }
        let end_row = anchor.row.checked_add(rows - 1)?;
        let end_col = anchor.col.checked_add(cols - 1)?;
        Some(CellRange::new(anchor.sheet, anchor.coord(), (end_row, end_col)))
    }

    /// Literal cell edits that write this grid at `anchor`.
    pub fn to_edits(&self, anchor: CellKey) -> Vec<(CellKey, CellContent)> {
        let mut edits = Vec::new();
        for (r, row) in self.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                let key = CellKey::new(anchor.sheet, anchor.row + r as u32, anchor.col + c as u32);
                let content = match value {
                    CellValue::Empty => CellContent::Empty,
                    other => CellContent::Value(other.clone()),
                };
                edits.push((key, content));
            }
        }
        edits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view() -> PivotView {
        PivotView {
            pivot_id: 1,
            label_columns: 1,
            rows: vec![
                vec![CellValue::Text("Region".into()), CellValue::Text("Sum of Sales".into())],
                vec![CellValue::Text("East".into()), CellValue::Number(5.0)],
                vec![CellValue::Empty, CellValue::Number(1.0)],
            ],
        }
    }

    #[test]
    fn shape_and_accessors() {
        let v = view();
        assert_eq!((v.row_count(), v.col_count()), (3, 2));
        assert_eq!(v.data_rows().len(), 2);
        assert_eq!(v.cell(1, 1), Some(&CellValue::Number(5.0)));
        assert_eq!(v.cell(5, 0), None);
    }

    #[test]
    fn footprint_and_edits() {
        let v = view();
        let anchor = CellKey::new(0, 4, 3);
        assert_eq!(v.footprint(anchor), Some(CellRange::new(0, (4, 3), (6, 4))));

        let edits = v.to_edits(anchor);
        assert_eq!(edits.len(), 6);
        assert_eq!(edits[0].0, anchor);
        assert_eq!(edits[4], (CellKey::new(0, 6, 3), CellContent::Empty));

        assert_eq!(v.footprint(CellKey::new(0, u32::MAX, 0)), None);
    }
}
