//! FILENAME: core/engine/src/functions/lookup.rs
//! PURPOSE: VLOOKUP, HLOOKUP, INDEX, MATCH, ROWS and COLUMNS.
//! CONTEXT: Tables are read through `Evaluator::eval_table`, so positions are
//! checked against the referenced size while only the used cells are read.
//! Approximate lookups assume the search vector is sorted and return the
//! last position that does not pass the lookup value.

use super::criteria::wildcard_match;
use super::{is_reference, num_arg};
use crate::cell::CellError;
use crate::evaluator::{compare_values, EvalResult, Evaluator};
use parser::Expression;
use std::cmp::Ordering;

fn same_kind(a: &EvalResult, b: &EvalResult) -> bool {
    matches!(
        (a, b),
        (EvalResult::Number(_), EvalResult::Number(_))
            | (EvalResult::Text(_), EvalResult::Text(_))
            | (EvalResult::Boolean(_), EvalResult::Boolean(_))
    )
}

/// Exact equality; text is case-insensitive and honours wildcards.
fn exact_match(needle: &EvalResult, candidate: &EvalResult) -> bool {
    match (needle, candidate) {
        (EvalResult::Text(pattern), EvalResult::Text(text))
            if pattern.contains('*') || pattern.contains('?') =>
        {
            wildcard_match(pattern, text)
        }
        _ => same_kind(needle, candidate) && compare_values(needle, candidate) == Ordering::Equal,
    }
}

/// Position of `needle` in `vector`, 0-based.
/// `mode` 0 is exact, 1 is largest value <= needle (ascending data),
/// -1 is smallest value >= needle (descending data).
fn find_position(needle: &EvalResult, vector: &[EvalResult], mode: i32) -> Option<usize> {
    if mode == 0 {
        return vector.iter().position(|v| exact_match(needle, v));
    }

    let mut found = None;
    for (i, candidate) in vector.iter().enumerate() {
        if !same_kind(needle, candidate) {
            continue;
        }
        let ord = compare_values(candidate, needle);
        let acceptable = if mode > 0 {
            ord != Ordering::Greater
        } else {
            ord != Ordering::Less
        };
        if acceptable {
            found = Some(i);
            if ord == Ordering::Equal {
                break;
            }
        } else {
            break;
        }
    }
    found
}

fn lookup_mode(ev: &Evaluator, args: &[Expression], index: usize) -> Result<i32, CellError> {
    match args.get(index) {
        Some(expr) => Ok(if ev.eval_scalar(expr).to_boolean()? { 1 } else { 0 }),
        None => Ok(1),
    }
}

fn needle(ev: &Evaluator, expr: &Expression) -> Result<EvalResult, CellError> {
    match ev.eval_scalar(expr) {
        EvalResult::Error(e) => Err(e),
        EvalResult::Empty => Ok(EvalResult::Number(0.0)),
        other => Ok(other),
    }
}

/// Reads a 1-based index argument. Values below `min` are #VALUE!.
fn index_arg(ev: &Evaluator, expr: &Expression, min: f64) -> Result<usize, CellError> {
    let n = num_arg(ev, expr)?.trunc();
    if n < min {
        return Err(CellError::Value);
    }
    Ok(n as usize)
}

fn result_of(r: Result<EvalResult, CellError>) -> EvalResult {
    r.unwrap_or_else(EvalResult::Error)
}

/// VLOOKUP(value, table, col_index, [approximate])
pub fn vlookup(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    result_of((|| {
        let value = needle(ev, &args[0])?;
        let table = ev.eval_table(&args[1])?;
        let col = index_arg(ev, &args[2], 1.0)?;
        let mode = lookup_mode(ev, args, 3)?;

        if col as u64 > table.width {
            return Err(CellError::Ref);
        }

        let keys: Vec<EvalResult> = (0..table.rows.len()).map(|r| table.get(r, 0)).collect();
        let hit = find_position(&value, &keys, mode).ok_or(CellError::NA)?;
        Ok(table.get(hit, col - 1))
    })())
}

/// HLOOKUP(value, table, row_index, [approximate])
pub fn hlookup(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    result_of((|| {
        let value = needle(ev, &args[0])?;
        let table = ev.eval_table(&args[1])?;
        let row = index_arg(ev, &args[2], 1.0)?;
        let mode = lookup_mode(ev, args, 3)?;

        if row as u64 > table.height {
            return Err(CellError::Ref);
        }

        let keys = table.rows.first().cloned().unwrap_or_default();
        let hit = find_position(&value, &keys, mode).ok_or(CellError::NA)?;
        Ok(table.get(row - 1, hit))
    })())
}

/// INDEX(array, row, [col]). Both indices are 1-based; 0 selects the whole
/// row or column. A single-row array accepts the column as its only index.
pub fn index(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    result_of((|| {
        let table = ev.eval_table(&args[0])?;
        let (height, width) = (table.height, table.width);

        let first = index_arg(ev, &args[1], 0.0)?;
        let (row, col) = match args.get(2) {
            Some(expr) => (first, index_arg(ev, expr, 0.0)?),
            None if height == 1 && width > 1 => (1, first),
            None => (first, 1),
        };

        if row as u64 > height || col as u64 > width {
            return Err(CellError::Ref);
        }

        // Whole rows and columns come back clipped like any other range
        match (row, col) {
            (0, 0) => Ok(EvalResult::Array(table.rows)),
            (0, c) => Ok(EvalResult::Array(
                (0..table.rows.len()).map(|r| vec![table.get(r, c - 1)]).collect(),
            )),
            (r, 0) => Ok(EvalResult::Array(vec![table
                .rows
                .get(r - 1)
                .cloned()
                .unwrap_or_default()])),
            (r, c) => Ok(table.get(r - 1, c - 1)),
        }
    })())
}

/// MATCH(value, vector, [type]). Returns the 1-based position.
pub fn match_fn(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    result_of((|| {
        let value = needle(ev, &args[0])?;
        let table = ev.eval_table(&args[1])?;
        let mode = match args.get(2) {
            Some(expr) => {
                let t = num_arg(ev, expr)?;
                if t > 0.0 {
                    1
                } else if t < 0.0 {
                    -1
                } else {
                    0
                }
            }
            None => 1,
        };

        if table.height > 1 && table.width > 1 {
            return Err(CellError::NA);
        }

        let vector: Vec<EvalResult> = table.rows.into_iter().flatten().collect();
        let hit = find_position(&value, &vector, mode).ok_or(CellError::NA)?;
        Ok(EvalResult::Number((hit + 1) as f64))
    })())
}

/// ROWS(reference). Whole columns report the full sheet height.
pub fn rows(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    if is_reference(&args[0]) {
        return match ev.resolve_range(&args[0]) {
            Ok(range) => EvalResult::Number(range.rows() as f64),
            Err(e) => EvalResult::Error(e),
        };
    }
    match ev.eval_array(&args[0]) {
        Ok(table) => EvalResult::Number(table.len() as f64),
        Err(e) => EvalResult::Error(e),
    }
}

/// COLUMNS(reference). Whole rows report the full sheet width.
pub fn columns(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    if is_reference(&args[0]) {
        return match ev.resolve_range(&args[0]) {
            Ok(range) => EvalResult::Number(range.cols() as f64),
            Err(e) => EvalResult::Error(e),
        };
    }
    match ev.eval_array(&args[0]) {
        Ok(table) => EvalResult::Number(table.first().map_or(0, |row| row.len()) as f64),
        Err(e) => EvalResult::Error(e),
    }
}
