//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - Transforms a workbook range into a pivot view.
//!
//! Calculation is a pure read of the workbook: resolve the configured
//! fields against the header row, fold every record into the cache, then
//! lay out the header row and one row per group.

use crate::cache::PivotCache;
use crate::definition::{FieldIndex, FieldRef, MeasureField, PivotDefinition, PivotId};
use crate::error::{PivotResult, ValidationError};
use crate::view::PivotView;
use engine::{CellRange, CellValue, EngineError, Workbook};

// ============================================================================
// SOURCE DATA
// ============================================================================

/// The source range as read from the workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceData {
    pub headers: Vec<CellValue>,
    /// Non-blank rows below the header.
    pub records: Vec<Vec<CellValue>>,
    /// Column count of the configured range (before clipping).
    pub width: u64,
}

/// Reads a source range. Whole-row and whole-column ranges are clipped to
/// the sheet's used area; rows with no content at all are skipped.
pub fn read_source(workbook: &Workbook, source: &CellRange) -> PivotResult<SourceData> {
    let sheet = workbook
        .sheet(source.sheet)
        .ok_or(EngineError::SheetOutOfRange {
            index: source.sheet,
            count: workbook.sheet_count(),
        })?;
    let grid = sheet.grid();
    let end_row = source.end_row.min(grid.max_row.max(source.start_row));
    let end_col = source.end_col.min(grid.max_col.max(source.start_col));

    let snapshot = workbook.get_range(
        source.sheet,
        (source.start_row, source.start_col),
        (end_row, end_col),
    )?;

    let mut rows = snapshot
        .into_iter()
        .map(|row| row.into_iter().map(|cell| cell.value).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    let records = rows
        .filter(|row| row.iter().any(|v| !v.is_empty()))
        .collect();

    Ok(SourceData {
        headers,
        records,
        width: source.cols(),
    })
}

/// Display text of a source column header. Blank headers become "ColumnN".
pub fn header_text(headers: &[CellValue], index: FieldIndex) -> String {
    match headers.get(index) {
        Some(v) if !v.is_empty() => v.display_value(),
        _ => format!("Column{}", index + 1),
    }
}

/// Resolves a field reference to a column of the source.
/// Names match header text case-insensitively.
pub fn resolve_field(
    headers: &[CellValue],
    width: u64,
    field: &FieldRef,
) -> Result<FieldIndex, ValidationError> {
    match field {
        FieldRef::Index(index) => {
            if (*index as u64) < width {
                Ok(*index)
            } else {
                Err(ValidationError::FieldOutOfRange {
                    index: *index,
                    width,
                })
            }
        }
        FieldRef::Name(name) => {
            let wanted = name.trim().to_lowercase();
            headers
                .iter()
                .position(|h| !h.is_empty() && h.display_value().trim().to_lowercase() == wanted)
                .ok_or_else(|| ValidationError::unknown(field))
        }
    }
}

/// Header text of a measure column.
pub fn measure_label(measure: &MeasureField, field_name: &str) -> String {
    match &measure.label {
        Some(label) => label.clone(),
        None => format!("{} of {}", measure.aggregation.display_name(), field_name),
    }
}

// ============================================================================
// CALCULATION
// ============================================================================

/// Calculates a pivot view from the current workbook values.
pub fn calculate_pivot(
    pivot_id: PivotId,
    definition: &PivotDefinition,
    workbook: &Workbook,
) -> PivotResult<PivotView> {
    engine::log_enter!("PIVOT", "calculate_pivot", "id={} source={}", pivot_id, definition.source);

    if definition.group_by.is_empty() && definition.measures.is_empty() {
        return Err(ValidationError::NoFields.into());
    }

    let source = read_source(workbook, &definition.source)?;
    let group_fields = definition
        .group_by
        .iter()
        .map(|f| resolve_field(&source.headers, source.width, f))
        .collect::<Result<Vec<_>, _>>()?;
    let measure_fields = definition
        .measures
        .iter()
        .map(|m| resolve_field(&source.headers, source.width, &m.field))
        .collect::<Result<Vec<_>, _>>()?;

    let mut cache = PivotCache::new(group_fields.clone(), measure_fields.clone());
    for record in &source.records {
        cache.add_record(record);
    }

    let mut header: Vec<CellValue> = group_fields
        .iter()
        .map(|&i| CellValue::Text(header_text(&source.headers, i)))
        .collect();
    header.extend(
        definition
            .measures
            .iter()
            .zip(&measure_fields)
            .map(|(m, &i)| CellValue::Text(measure_label(m, &header_text(&source.headers, i)))),
    );

    let mut rows = Vec::with_capacity(cache.group_count() + 1);
    rows.push(header);
    for group in cache.groups() {
        let mut row = group.labels.clone();
        row.extend(
            definition
                .measures
                .iter()
                .zip(&group.accumulators)
                .map(|(m, acc)| acc.result(m.aggregation)),
        );
        rows.push(row);
    }

    engine::log_exit!(
        "PIVOT",
        "calculate_pivot",
        "id={} records={} groups={}",
        pivot_id,
        source.records.len(),
        cache.group_count()
    );

    Ok(PivotView {
        pivot_id,
        label_columns: group_fields.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AggregationType, MeasureField};
    use crate::error::PivotError;
    use engine::{CellContent, CellError, CellKey};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    /// Region | Product | Sales over A1:C7.
    fn sales_workbook() -> Workbook {
        let data = [
            ["Region", "Product", "Sales"],
            ["East", "Apples", "10"],
            ["West", "Pears", "7"],
            ["east", "Pears", "5"],
            ["West", "Apples", "x"],
            ["North", "Apples", ""],
            ["East", "Apples", "3"],
        ];
        let mut wb = Workbook::new("Sales");
        let mut edits = Vec::new();
        for (r, row) in data.iter().enumerate() {
            for (c, raw) in row.iter().enumerate() {
                edits.push((CellKey::new(0, r as u32, c as u32), CellContent::from_input(raw)));
            }
        }
        wb.set_cells(edits, None).unwrap();
        wb
    }

    fn source() -> CellRange {
        CellRange::new(0, (0, 0), (6, 2))
    }

    #[test]
    fn test_basic_pivot_calculation() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source())
            .group_by("Region")
            .measure(MeasureField::new("Sales", AggregationType::Sum))
            .measure(MeasureField::new("Sales", AggregationType::Count));
        let view = calculate_pivot(1, &def, &wb).unwrap();

        assert_eq!(
            view.header(),
            &[text("Region"), text("Sum of Sales"), text("Count of Sales")]
        );
        assert_eq!(
            view.data_rows(),
            &[
                vec![text("East"), num(18.0), num(3.0)],
                vec![text("West"), num(7.0), num(2.0)],
                vec![text("North"), num(0.0), num(0.0)],
            ]
        );
        assert_eq!(view.label_columns, 1);
    }

    #[test]
    fn test_multiple_group_fields() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source())
            .group_by(1usize)
            .group_by("region")
            .measure(MeasureField::new(2usize, AggregationType::Max).with_label("Best"));
        let view = calculate_pivot(2, &def, &wb).unwrap();

        assert_eq!(view.header(), &[text("Product"), text("Region"), text("Best")]);
        let labels: Vec<_> = view.data_rows().iter().map(|r| r[..2].to_vec()).collect();
        assert_eq!(
            labels,
            vec![
                vec![text("Apples"), text("East")],
                vec![text("Pears"), text("West")],
                vec![text("Pears"), text("east")],
                vec![text("Apples"), text("West")],
                vec![text("Apples"), text("North")],
            ]
        );
    }

    #[test]
    fn test_no_group_fields() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source())
            .measure(MeasureField::new("Sales", AggregationType::Average))
            .measure(MeasureField::new("Sales", AggregationType::Min));
        let view = calculate_pivot(3, &def, &wb).unwrap();
        assert_eq!(view.data_rows(), &[vec![num(6.25), num(3.0)]]);
    }

    #[test]
    fn test_no_measures() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source()).group_by("Product");
        let view = calculate_pivot(4, &def, &wb).unwrap();
        assert_eq!(view.col_count(), 1);
        assert_eq!(view.row_count(), 3);
    }

    #[test]
    fn test_average_without_numbers_is_div0() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source())
            .group_by("Region")
            .measure(MeasureField::new("Sales", AggregationType::Average))
            .measure(MeasureField::new("Sales", AggregationType::Min));
        let view = calculate_pivot(5, &def, &wb).unwrap();
        let north = &view.data_rows()[2];
        assert_eq!(north[1], CellValue::Error(CellError::Div0));
        assert_eq!(north[2], num(0.0));
    }

    #[test]
    fn test_error_values_propagate() {
        let mut wb = sales_workbook();
        wb.set_cell(0, 2, 2, CellContent::from_input("=1/0")).unwrap();
        let def = PivotDefinition::new(source())
            .group_by("Region")
            .measure(MeasureField::new("Sales", AggregationType::Sum))
            .measure(MeasureField::new("Sales", AggregationType::Count));
        let view = calculate_pivot(6, &def, &wb).unwrap();
        let west = &view.data_rows()[1];
        assert_eq!(west[1], CellValue::Error(CellError::Div0));
        assert_eq!(west[2], num(2.0));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(source()).group_by("Country");
        assert_eq!(
            calculate_pivot(7, &def, &wb),
            Err(PivotError::Validation(ValidationError::UnknownField(
                "Country".to_string()
            )))
        );

        let def = PivotDefinition::new(source())
            .measure(MeasureField::new(3usize, AggregationType::Sum));
        assert!(matches!(
            calculate_pivot(7, &def, &wb),
            Err(PivotError::Validation(ValidationError::FieldOutOfRange { index: 3, width: 3 }))
        ));

        let def = PivotDefinition::new(source());
        assert_eq!(
            calculate_pivot(7, &def, &wb),
            Err(PivotError::Validation(ValidationError::NoFields))
        );
    }

    #[test]
    fn test_whole_column_source_is_clipped() {
        let wb = sales_workbook();
        let full = CellRange::new(0, (0, 0), (u32::MAX, 2));
        let def = PivotDefinition::new(full)
            .group_by("Region")
            .measure(MeasureField::new("Sales", AggregationType::Sum));
        let view = calculate_pivot(8, &def, &wb).unwrap();
        assert_eq!(view.row_count(), 4);
    }

    #[test]
    fn test_missing_sheet() {
        let wb = sales_workbook();
        let def = PivotDefinition::new(CellRange::new(4, (0, 0), (3, 3))).group_by(0usize);
        assert!(matches!(
            calculate_pivot(9, &def, &wb),
            Err(PivotError::Engine(EngineError::SheetOutOfRange { index: 4, .. }))
        ));
    }

    #[test]
    fn test_blank_headers_are_named_by_position() {
        let wb = sales_workbook();
        assert_eq!(header_text(&[text("A"), CellValue::Empty], 1), "Column2");
        assert_eq!(header_text(&[num(2024.0)], 0), "2024");
        let src = read_source(&wb, &source()).unwrap();
        assert_eq!(src.records.len(), 6);
    }
}
