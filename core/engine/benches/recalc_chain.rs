//! FILENAME: core/engine/benches/recalc_chain.rs
//! Benchmarks for incremental recalculation.
//!
//! Run with: cargo bench -p engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use engine::{CellContent, CellKey, Workbook};

/// A1 = 1, A2 = A1 + 1, ... An = A(n-1) + 1
fn chain_workbook(length: u32) -> Workbook {
    let mut wb = Workbook::new("Chain");
    let mut edits = vec![(CellKey::new(0, 0, 0), CellContent::from_input("1"))];
    for row in 1..length {
        edits.push((
            CellKey::new(0, row, 0),
            CellContent::Formula(format!("=A{}+1", row)),
        ));
    }
    wb.set_cells(edits, None).expect("chain should build");
    wb
}

/// Column B sums all of column A, once per row.
fn fan_in_workbook(rows: u32) -> Workbook {
    let mut wb = Workbook::new("Fan-in");
    let mut edits = Vec::new();
    for row in 0..rows {
        edits.push((
            CellKey::new(0, row, 0),
            CellContent::from_input(&row.to_string()),
        ));
        edits.push((
            CellKey::new(0, row, 1),
            CellContent::Formula(format!("=SUM(A1:A{}) * {}", rows, row)),
        ));
    }
    wb.set_cells(edits, None).expect("fan-in should build");
    wb
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("recalc_chain");

    for &length in &[100u32, 1_000, 5_000] {
        group.bench_with_input(BenchmarkId::new("edit_head", length), &length, |b, &length| {
            let mut wb = chain_workbook(length);
            let mut v = 0u64;
            b.iter(|| {
                v += 1;
                let outcome = wb
                    .set_cell(0, 0, 0, CellContent::from_input(&v.to_string()))
                    .expect("edit");
                black_box(outcome.report.recalculated.len())
            });
        });
    }

    group.finish();
}

fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("recalc_fan_in");

    for &rows in &[100u32, 1_000] {
        group.bench_with_input(BenchmarkId::new("edit_source", rows), &rows, |b, &rows| {
            let mut wb = fan_in_workbook(rows);
            b.iter(|| {
                let outcome = wb
                    .set_cell(0, rows / 2, 0, CellContent::from_input("42"))
                    .expect("edit");
                black_box(outcome.changed.len())
            });
        });
    }

    group.finish();
}

fn bench_rebuild(c: &mut Criterion) {
    c.bench_function("rebuild_all_1000_chain", |b| {
        let mut wb = chain_workbook(1_000);
        b.iter(|| black_box(wb.rebuild_all().recalculated.len()));
    });
}

criterion_group!(benches, bench_chain, bench_fan_in, bench_rebuild);
criterion_main!(benches);
