//! FILENAME: core/engine/src/functions/info.rs
//! PURPOSE: Type tests. These never propagate errors; they inspect them.

use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use parser::Expression;

fn inspect<F>(ev: &Evaluator, args: &[Expression], test: F) -> EvalResult
where
    F: Fn(&EvalResult) -> bool,
{
    EvalResult::Boolean(test(&ev.eval_scalar(&args[0])))
}

pub fn isnumber(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    inspect(ev, args, |v| matches!(v, EvalResult::Number(_)))
}

pub fn istext(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    inspect(ev, args, |v| matches!(v, EvalResult::Text(_)))
}

pub fn isblank(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    inspect(ev, args, |v| matches!(v, EvalResult::Empty))
}

pub fn iserror(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    inspect(ev, args, EvalResult::is_error)
}

pub fn isna(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    inspect(ev, args, |v| matches!(v, EvalResult::Error(CellError::NA)))
}
