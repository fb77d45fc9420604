//! FILENAME: core/pivot-engine/benches/pivot_calculations.rs
//! Benchmarks for pivot calculation over generated sales data.
//!
//! Run with: cargo bench -p pivot-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use engine::{CellContent, CellKey, CellRange, CellValue, Workbook};
use pivot_engine::{calculate_pivot, AggregationType, MeasureField, PivotDefinition};

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const PRODUCTS: [&str; 6] = ["Apples", "Pears", "Plums", "Figs", "Kiwis", "Limes"];

fn sales_workbook(rows: u32) -> Workbook {
    let mut wb = Workbook::new("Bench");
    let mut edits = vec![
        (CellKey::new(0, 0, 0), CellContent::from_input("Region")),
        (CellKey::new(0, 0, 1), CellContent::from_input("Product")),
        (CellKey::new(0, 0, 2), CellContent::from_input("Sales")),
    ];
    for row in 1..=rows {
        let i = row as usize;
        edits.push((
            CellKey::new(0, row, 0),
            CellContent::Value(CellValue::Text(REGIONS[i % REGIONS.len()].to_string())),
        ));
        edits.push((
            CellKey::new(0, row, 1),
            CellContent::Value(CellValue::Text(PRODUCTS[(i * 7) % PRODUCTS.len()].to_string())),
        ));
        edits.push((
            CellKey::new(0, row, 2),
            CellContent::Value(CellValue::Number((i % 97) as f64 * 1.5)),
        ));
    }
    wb.set_cells(edits, None).expect("source data");
    wb
}

fn definition(rows: u32) -> PivotDefinition {
    PivotDefinition::new(CellRange::new(0, (0, 0), (rows, 2)))
        .group_by("Region")
        .group_by("Product")
        .measure(MeasureField::new("Sales", AggregationType::Sum))
        .measure(MeasureField::new("Sales", AggregationType::Average))
        .measure(MeasureField::new("Sales", AggregationType::Max))
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("pivot_calculate");

    for &rows in &[1_000u32, 10_000, 50_000] {
        let wb = sales_workbook(rows);
        let def = definition(rows);
        group.bench_with_input(BenchmarkId::new("two_groups_three_measures", rows), &rows, |b, _| {
            b.iter(|| {
                let view = calculate_pivot(1, black_box(&def), &wb).expect("pivot");
                black_box(view.row_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_calculate);
criterion_main!(benches);
