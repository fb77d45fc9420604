//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod logging;

pub mod cell;
pub mod coord;
pub mod dependency_extractor;
pub mod dependency_graph;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod grid;
pub mod recalc;
pub mod workbook;

// Re-export commonly used types at the crate root
pub use cell::{format_number, Cell, CellContent, CellError, CellValue};
pub use coord::{
    a1_to_coord, col_to_index, coord_to_a1, index_to_col, parse_a1, CellCoord, CellKey, CellRange,
};
pub use dependency_extractor::{extract_dependencies, Dependencies, SheetLookup};
pub use dependency_graph::{CycleError, DependencyGraph};
pub use error::{EngineError, EngineResult};
pub use evaluator::{CellSource, EvalResult, Evaluator, Table};
pub use functions::{date_to_serial, serial_to_date};
pub use grid::Grid;
pub use recalc::{CalculationMode, RecalcReport};
pub use workbook::{CellSnapshot, EditOutcome, Editor, Overwrite, Sheet, Workbook};

#[cfg(test)]
mod tests {
    use super::*;

    fn input(wb: &mut Workbook, sheet: u32, a1: &str, raw: &str) {
        let (row, col) = parse_a1(a1).unwrap();
        wb.set_cell(sheet, row, col, CellContent::from_input(raw))
            .unwrap();
    }

    fn read(wb: &Workbook, sheet: u32, a1: &str) -> CellValue {
        let (row, col) = parse_a1(a1).unwrap();
        wb.get_cell(sheet, row, col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    #[test]
    fn it_creates_cells() {
        let cell = Cell::new_number(42.0);
        assert_eq!(cell.value, CellValue::Number(42.0));
    }

    #[test]
    fn integration_test_dependency_workflow() {
        let mut graph = DependencyGraph::new();
        let expr = parser::parse("=A1+B1").unwrap();

        struct OneSheet;
        impl SheetLookup for OneSheet {
            fn sheet_index(&self, _name: &str) -> Option<u32> {
                None
            }
        }

        let c1 = CellKey::new(0, 0, 2);
        let deps = extract_dependencies(&expr, 0, &OneSheet);
        assert!(!graph.would_create_cycle(c1, &deps));
        graph.set_dependencies(c1, deps);

        let affected = graph.transitive_dependents([CellKey::new(0, 0, 0)]);
        let order = graph.topological_order(&affected).unwrap();
        assert_eq!(order, vec![c1]);
    }

    #[test]
    fn integration_test_full_evaluation_workflow() {
        let mut wb = Workbook::new("Quarterly");
        input(&mut wb, 0, "A1", "100");
        input(&mut wb, 0, "A2", "250");
        input(&mut wb, 0, "A3", "=IF(SUM(A1:A2) > 300, \"over\", \"under\")");
        input(&mut wb, 0, "A4", "=ROUND(AVERAGE(A1:A2) / 3, 2)");

        assert_eq!(read(&wb, 0, "A3"), CellValue::Text("over".to_string()));
        assert_eq!(read(&wb, 0, "A4"), CellValue::Number(58.33));

        input(&mut wb, 0, "A2", "10");
        assert_eq!(read(&wb, 0, "A3"), CellValue::Text("under".to_string()));
        assert_eq!(read(&wb, 0, "A4"), CellValue::Number(18.33));
    }

    #[test]
    fn integration_test_cross_sheet_chain() {
        let mut wb = Workbook::new("Links");
        let inputs = wb.add_sheet("Inputs").unwrap();
        input(&mut wb, inputs, "B2", "3");
        input(&mut wb, 0, "A1", "=Inputs!B2 * 2");
        input(&mut wb, inputs, "B3", "=Sheet1!A1 + 1");

        assert_eq!(read(&wb, 0, "A1"), CellValue::Number(6.0));
        assert_eq!(read(&wb, inputs, "B3"), CellValue::Number(7.0));

        input(&mut wb, inputs, "B2", "5");
        assert_eq!(read(&wb, inputs, "B3"), CellValue::Number(11.0));
    }

    #[test]
    fn integration_test_cycle_prevention() {
        let mut wb = Workbook::new("Cycle");
        input(&mut wb, 0, "A1", "=B1");
        input(&mut wb, 0, "B1", "=C1");
        input(&mut wb, 0, "C1", "=A1");

        for cell in ["A1", "B1", "C1"] {
            assert_eq!(read(&wb, 0, cell), CellValue::Error(CellError::Circular));
        }
        assert_eq!(wb.graph().formula_cell_count(), 3);
        assert_eq!(wb.graph().dependency_count(), 2);
    }
}
