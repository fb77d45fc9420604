//! FILENAME: core/engine/src/functions/aggregate.rs
//! PURPOSE: SUM, AVERAGE, MIN, MAX, COUNT and their conditional variants.

use super::criteria::Criterion;
use super::{collect_numbers, finish, is_reference};
use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator, Table};
use parser::Expression;

pub fn sum(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(collect_numbers(ev, args).map(|nums| nums.iter().sum()))
}

pub fn average(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(collect_numbers(ev, args).and_then(|nums| {
        if nums.is_empty() {
            Err(CellError::Div0)
        } else {
            Ok(nums.iter().sum::<f64>() / nums.len() as f64)
        }
    }))
}

pub fn min(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(collect_numbers(ev, args).map(|nums| {
        nums.into_iter().reduce(f64::min).unwrap_or(0.0)
    }))
}

pub fn max(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(collect_numbers(ev, args).map(|nums| {
        nums.into_iter().reduce(f64::max).unwrap_or(0.0)
    }))
}

pub fn product(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(collect_numbers(ev, args).map(|nums| {
        if nums.is_empty() {
            0.0
        } else {
            nums.iter().product()
        }
    }))
}

/// Counts numeric values. Never returns an error.
pub fn count(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let mut total = 0usize;
    for arg in args {
        let result = ev.evaluate(arg);
        if is_reference(arg) || matches!(result, EvalResult::Array(_)) {
            total += result
                .flatten()
                .iter()
                .filter(|v| matches!(v, EvalResult::Number(_)))
                .count();
        } else {
            // Direct arguments count when they coerce to a number
            let counts = match &result {
                EvalResult::Number(_) | EvalResult::Boolean(_) => true,
                EvalResult::Text(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            };
            if counts {
                total += 1;
            }
        }
    }
    EvalResult::Number(total as f64)
}

/// Counts non-empty values, errors included.
pub fn counta(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let total: usize = args
        .iter()
        .map(|arg| {
            ev.evaluate(arg)
                .flatten()
                .iter()
                .filter(|v| !matches!(v, EvalResult::Empty))
                .count()
        })
        .sum();
    EvalResult::Number(total as f64)
}

/// Counts empty cells and empty strings in a range.
/// Cells past the used extent are never read; they are all blank.
pub fn countblank(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let table = match ev.eval_table(&args[0]) {
        Ok(table) => table,
        Err(e) => return EvalResult::Error(e),
    };
    let filled = table.stored().filter(|v| !is_blank(v)).count() as u64;
    EvalResult::Number(table.cell_count().saturating_sub(filled) as f64)
}

fn is_blank(value: &EvalResult) -> bool {
    match value {
        EvalResult::Empty => true,
        EvalResult::Text(s) => s.is_empty(),
        _ => false,
    }
}

/// Criteria matches from a conditional aggregate.
struct Matches {
    /// Values paired with matching criteria cells that were read.
    values: Vec<EvalResult>,
    /// Matching offsets that lie past the used extent of both ranges. Their
    /// values are blank.
    blank: u64,
}

fn stored_size(table: &Table) -> (usize, usize) {
    (table.rows.len(), table.rows.first().map_or(0, |r| r.len()))
}

/// Pairs each criteria cell with the value at the same offset in the
/// sum range (or itself when no sum range is given) and keeps the matches.
/// Only offsets inside the stored part of either range are visited.
fn matching_values(ev: &Evaluator, args: &[Expression]) -> Result<Matches, CellError> {
    let criteria = ev.eval_table(&args[0])?;
    let criterion = match ev.eval_scalar(&args[1]) {
        EvalResult::Error(e) => return Err(e),
        value => Criterion::from_value(&value),
    };

    let sum_range = match args.get(2) {
        Some(expr) => Some(ev.eval_table(expr)?),
        None => None,
    };
    let values = sum_range.as_ref().unwrap_or(&criteria);

    let (criteria_rows, criteria_cols) = stored_size(&criteria);
    let (value_rows, value_cols) = stored_size(values);
    let clamp = |n: usize, limit: u64| n.min(usize::try_from(limit).unwrap_or(usize::MAX));
    let height = clamp(criteria_rows.max(value_rows), criteria.height);
    let width = clamp(criteria_cols.max(value_cols), criteria.width);

    let mut out = Vec::new();
    for r in 0..height {
        for c in 0..width {
            if criterion.matches(&criteria.get(r, c)) {
                out.push(values.get(r, c));
            }
        }
    }

    let unvisited = criteria.cell_count().saturating_sub((height * width) as u64);
    let blank = if unvisited > 0 && criterion.matches(&EvalResult::Empty) {
        unvisited
    } else {
        0
    };
    Ok(Matches { values: out, blank })
}

fn matching_numbers(ev: &Evaluator, args: &[Expression]) -> Result<Vec<f64>, CellError> {
    let mut nums = Vec::new();
    for value in matching_values(ev, args)?.values {
        match value {
            EvalResult::Number(n) => nums.push(n),
            EvalResult::Error(e) => return Err(e),
            _ => {}
        }
    }
    Ok(nums)
}

pub fn sumif(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(matching_numbers(ev, args).map(|nums| nums.iter().sum()))
}

pub fn countif(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match matching_values(ev, args) {
        Ok(matches) => EvalResult::Number((matches.values.len() as u64 + matches.blank) as f64),
        Err(e) => EvalResult::Error(e),
    }
}

pub fn averageif(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(matching_numbers(ev, args).and_then(|nums| {
        if nums.is_empty() {
            Err(CellError::Div0)
        } else {
            Ok(nums.iter().sum::<f64>() / nums.len() as f64)
        }
    }))
}
