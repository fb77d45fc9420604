//! FILENAME: core/engine/src/functions/mod.rs
//! PURPOSE: Built-in function dispatch and shared argument helpers.
//! CONTEXT: The parser has already resolved each call to a `BuiltinFunction`;
//! this module checks the argument count against the registry signature and
//! routes to the category module that implements it.

mod aggregate;
mod criteria;
mod date;
mod info;
mod logical;
mod lookup;
mod math;
mod text;

pub use criteria::Criterion;
pub use date::{date_to_serial, serial_to_date};
pub(crate) use text::concat_text;

use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use parser::{BuiltinFunction, Expression};

/// Longest text a formula may produce, in characters. Longer results are
/// `#VALUE!`.
pub const MAX_TEXT_LEN: usize = 32_767;

/// `#VALUE!` unless `chars` fits in a text result.
pub(crate) fn check_text_len(chars: usize) -> Result<(), CellError> {
    if chars > MAX_TEXT_LEN {
        Err(CellError::Value)
    } else {
        Ok(())
    }
}

/// Evaluates a function call.
pub(crate) fn call(ev: &Evaluator, func: &BuiltinFunction, args: &[Expression]) -> EvalResult {
    let sig = match func.signature() {
        Some(sig) => sig,
        None => return EvalResult::Error(CellError::Name),
    };
    if !sig.accepts(args.len()) {
        return EvalResult::Error(CellError::Value);
    }

    use BuiltinFunction as F;
    match func {
        // Aggregate functions
        F::Sum => aggregate::sum(ev, args),
        F::Average => aggregate::average(ev, args),
        F::Min => aggregate::min(ev, args),
        F::Max => aggregate::max(ev, args),
        F::Count => aggregate::count(ev, args),
        F::CountA => aggregate::counta(ev, args),
        F::CountBlank => aggregate::countblank(ev, args),
        F::Product => aggregate::product(ev, args),
        F::SumIf => aggregate::sumif(ev, args),
        F::CountIf => aggregate::countif(ev, args),
        F::AverageIf => aggregate::averageif(ev, args),

        // Logical functions
        F::If => logical::if_fn(ev, args),
        F::And => logical::and(ev, args),
        F::Or => logical::or(ev, args),
        F::Not => logical::not(ev, args),
        F::Xor => logical::xor(ev, args),
        F::IfError => logical::iferror(ev, args),
        F::IfNa => logical::ifna(ev, args),
        F::True => EvalResult::Boolean(true),
        F::False => EvalResult::Boolean(false),

        // Math functions
        F::Abs => math::abs(ev, args),
        F::Round => math::round(ev, args),
        F::RoundUp => math::roundup(ev, args),
        F::RoundDown => math::rounddown(ev, args),
        F::Int => math::int(ev, args),
        F::Mod => math::modulo(ev, args),
        F::Power => math::power(ev, args),
        F::Sqrt => math::sqrt(ev, args),
        F::Floor => math::floor(ev, args),
        F::Ceiling => math::ceiling(ev, args),
        F::Sign => math::sign(ev, args),
        F::Pi => EvalResult::Number(std::f64::consts::PI),

        // Lookup & reference functions
        F::VLookup => lookup::vlookup(ev, args),
        F::HLookup => lookup::hlookup(ev, args),
        F::Index => lookup::index(ev, args),
        F::Match => lookup::match_fn(ev, args),
        F::Rows => lookup::rows(ev, args),
        F::Columns => lookup::columns(ev, args),

        // Text functions
        F::Len => text::len(ev, args),
        F::Upper => text::upper(ev, args),
        F::Lower => text::lower(ev, args),
        F::Trim => text::trim(ev, args),
        F::Concatenate => text::concatenate(ev, args),
        F::Left => text::left(ev, args),
        F::Right => text::right(ev, args),
        F::Mid => text::mid(ev, args),
        F::Rept => text::rept(ev, args),
        F::Find => text::find(ev, args),
        F::Substitute => text::substitute(ev, args),
        F::Value => text::value(ev, args),
        F::Exact => text::exact(ev, args),

        // Date functions
        F::Date => date::date(ev, args),
        F::Year => date::year(ev, args),
        F::Month => date::month(ev, args),
        F::Day => date::day(ev, args),
        F::Weekday => date::weekday(ev, args),
        F::Days => date::days(ev, args),
        F::EDate => date::edate(ev, args),

        // Information functions
        F::IsNumber => info::isnumber(ev, args),
        F::IsText => info::istext(ev, args),
        F::IsBlank => info::isblank(ev, args),
        F::IsError => info::iserror(ev, args),
        F::IsNa => info::isna(ev, args),
        F::Na => EvalResult::Error(CellError::NA),

        F::Unknown(_) => EvalResult::Error(CellError::Name),
    }
}

/// True for arguments that read cells. Values coming from references follow
/// the aggregate rules (text and booleans are skipped).
pub(crate) fn is_reference(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::CellRef { .. }
            | Expression::Range { .. }
            | Expression::ColumnRef { .. }
            | Expression::RowRef { .. }
    )
}

/// Evaluates an argument as a number.
pub(crate) fn num_arg(ev: &Evaluator, expr: &Expression) -> Result<f64, CellError> {
    ev.eval_scalar(expr).to_number()
}

/// Evaluates an optional argument as a number.
pub(crate) fn opt_num_arg(
    ev: &Evaluator,
    args: &[Expression],
    index: usize,
    default: f64,
) -> Result<f64, CellError> {
    match args.get(index) {
        Some(expr) => num_arg(ev, expr),
        None => Ok(default),
    }
}

/// Evaluates an argument as text.
pub(crate) fn text_arg(ev: &Evaluator, expr: &Expression) -> Result<String, CellError> {
    ev.eval_scalar(expr).to_text()
}

/// Collects numbers the way SUM does: referenced cells contribute only
/// numbers, direct arguments are coerced. Errors anywhere propagate.
pub(crate) fn collect_numbers(ev: &Evaluator, args: &[Expression]) -> Result<Vec<f64>, CellError> {
    let mut numbers = Vec::new();

    for arg in args {
        let result = ev.evaluate(arg);
        if is_reference(arg) || matches!(result, EvalResult::Array(_)) {
            for item in result.flatten() {
                match item {
                    EvalResult::Error(e) => return Err(e),
                    EvalResult::Number(n) => numbers.push(n),
                    // Skip non-numeric values in referenced cells
                    _ => {}
                }
            }
        } else {
            match result {
                EvalResult::Empty => {}
                other => numbers.push(other.to_number()?),
            }
        }
    }

    Ok(numbers)
}

/// Turns a fallible numeric computation into a result.
pub(crate) fn finish(result: Result<f64, CellError>) -> EvalResult {
    crate::evaluator::number_result(result)
}

#[cfg(test)]
mod tests;
