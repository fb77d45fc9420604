//! FILENAME: core/engine/src/functions/logical.rs
//! PURPOSE: IF, AND, OR, XOR, NOT, IFERROR and IFNA.

use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use parser::Expression;

/// IF(condition, then, [else]). Only the chosen branch is evaluated.
pub fn if_fn(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let condition = match ev.eval_scalar(&args[0]).to_boolean() {
        Ok(b) => b,
        Err(e) => return EvalResult::Error(e),
    };

    if condition {
        ev.evaluate(&args[1])
    } else {
        match args.get(2) {
            Some(expr) => ev.evaluate(expr),
            None => EvalResult::Boolean(false),
        }
    }
}

/// Collects the booleans of all arguments. Referenced text and empty cells
/// are ignored; a call with nothing usable is #VALUE!.
fn collect_booleans(ev: &Evaluator, args: &[Expression]) -> Result<Vec<bool>, CellError> {
    let mut values = Vec::new();
    for arg in args {
        let result = ev.evaluate(arg);
        if let EvalResult::Array(_) = result {
            for item in result.flatten() {
                match item {
                    EvalResult::Boolean(b) => values.push(b),
                    EvalResult::Number(n) => values.push(n != 0.0),
                    EvalResult::Error(e) => return Err(e),
                    _ => {}
                }
            }
        } else if super::is_reference(arg) {
            match result {
                EvalResult::Text(_) | EvalResult::Empty => {}
                other => values.push(other.to_boolean()?),
            }
        } else {
            values.push(result.to_boolean()?);
        }
    }

    if values.is_empty() {
        return Err(CellError::Value);
    }
    Ok(values)
}

pub fn and(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match collect_booleans(ev, args) {
        Ok(values) => EvalResult::Boolean(values.iter().all(|&b| b)),
        Err(e) => EvalResult::Error(e),
    }
}

pub fn or(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match collect_booleans(ev, args) {
        Ok(values) => EvalResult::Boolean(values.iter().any(|&b| b)),
        Err(e) => EvalResult::Error(e),
    }
}

/// True when an odd number of arguments are true.
pub fn xor(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match collect_booleans(ev, args) {
        Ok(values) => EvalResult::Boolean(values.iter().filter(|&&b| b).count() % 2 == 1),
        Err(e) => EvalResult::Error(e),
    }
}

pub fn not(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match ev.eval_scalar(&args[0]).to_boolean() {
        Ok(b) => EvalResult::Boolean(!b),
        Err(e) => EvalResult::Error(e),
    }
}

pub fn iferror(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match ev.evaluate(&args[0]) {
        EvalResult::Error(_) => ev.evaluate(&args[1]),
        other => other,
    }
}

pub fn ifna(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match ev.evaluate(&args[0]) {
        EvalResult::Error(CellError::NA) => ev.evaluate(&args[1]),
        other => other,
    }
}
