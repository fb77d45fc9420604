//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for service integration tests.

#![allow(dead_code)]

use app_lib::{
    create_app_state_with_clock, get_cell_range, update_cells, AppState, CellData,
    RangeRequest, ServiceConfig, SpreadsheetId, UpdateCellsRequest, UpdateCellsResponse,
};
use collab::ManualClock;
use engine::{parse_a1, CellValue};
use std::sync::Arc;

/// Test harness for creating and managing test state.
pub struct TestHarness {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub id: SpreadsheetId,
}

impl TestHarness {
    /// One spreadsheet with default configuration.
    pub fn new() -> Self {
        Self::with_config(ServiceConfig::default())
    }

    pub fn with_config(config: ServiceConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let state = create_app_state_with_clock(config, clock.clone());
        let id = app_lib::create_spreadsheet(&state, "Test").unwrap().id;
        TestHarness { state, clock, id }
    }

    /// Create a harness with the sales fixture at A1:E13 of Sheet1.
    pub fn with_sales_data() -> Self {
        let harness = Self::new();
        let mut values = vec![SalesFixture::headers()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()];
        for (region, product, quarter, sales, quantity) in SalesFixture::data() {
            values.push(vec![
                region.to_string(),
                product.to_string(),
                quarter.to_string(),
                sales.to_string(),
                quantity.to_string(),
            ]);
        }
        harness.write_block(0, 0, values);
        harness
    }

    /// Writes one raw input at an A1 address on Sheet1.
    pub fn set(&self, a1: &str, input: &str) -> UpdateCellsResponse {
        let (row, col) = parse_a1(a1).unwrap();
        self.write_block(row, col, vec![vec![input.to_string()]])
    }

    pub fn write_block(&self, row: u32, col: u32, values: Vec<Vec<String>>) -> UpdateCellsResponse {
        update_cells(
            &self.state,
            self.id,
            UpdateCellsRequest {
                sheet_index: 0,
                start_row: row,
                start_col: col,
                values,
                participant: None,
            },
        )
        .unwrap()
    }

    pub fn cell(&self, a1: &str) -> CellData {
        let (row, col) = parse_a1(a1).unwrap();
        let snapshot = get_cell_range(
            &self.state,
            self.id,
            RangeRequest {
                sheet_index: 0,
                start_row: row,
                start_col: col,
                end_row: row,
                end_col: col,
            },
        )
        .unwrap();
        snapshot.rows[0][0].clone()
    }

    pub fn value(&self, a1: &str) -> CellValue {
        self.cell(a1).value
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> Vec<&'static str> {
        vec!["Region", "Product", "Quarter", "Sales", "Quantity"]
    }

    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64)> {
        vec![
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Assert that a cell contains an expected number value.
pub fn assert_cell_number(harness: &TestHarness, a1: &str, expected: f64) {
    match harness.value(a1) {
        CellValue::Number(n) => {
            assert!(
                (n - expected).abs() < 0.001,
                "Cell {} expected {} but got {}",
                a1,
                expected,
                n
            );
        }
        other => panic!("Cell {} expected Number({}) but got {:?}", a1, expected, other),
    }
}
