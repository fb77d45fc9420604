//! FILENAME: core/engine/src/functions/math.rs
//! PURPOSE: Numeric functions (ABS, ROUND family, INT, MOD, POWER, ...).

use super::{finish, num_arg, opt_num_arg};
use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use parser::Expression;

/// Snaps values that are within float noise of an integer onto it, so that
/// 1.1 * 10 rounds up to 11 rather than 12.
fn snap(x: f64) -> f64 {
    let nearest = x.round();
    if (x - nearest).abs() <= 1e-9 * x.abs().max(1.0) {
        nearest
    } else {
        x
    }
}

/// Applies `f` to x shifted by `digits` decimal places and shifts back.
/// Negative digits shift to the left of the decimal point.
fn at_digits<F>(ev: &Evaluator, args: &[Expression], f: F) -> Result<f64, CellError>
where
    F: Fn(f64) -> f64,
{
    let x = num_arg(ev, &args[0])?;
    let digits = opt_num_arg(ev, args, 1, 0.0)?.trunc() as i32;
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        Ok(f(snap(x * factor)) / factor)
    } else {
        let factor = 10f64.powi(-digits);
        Ok(f(snap(x / factor)) * factor)
    }
}

pub fn abs(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(num_arg(ev, &args[0]).map(f64::abs))
}

/// ROUND(x, [digits]): half away from zero. Negative digits round to the
/// left of the decimal point.
pub fn round(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(at_digits(ev, args, f64::round))
}

/// ROUNDUP(x, [digits]): away from zero.
pub fn roundup(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(at_digits(ev, args, |scaled| scaled.abs().ceil().copysign(scaled)))
}

/// ROUNDDOWN(x, [digits]): toward zero.
pub fn rounddown(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(at_digits(ev, args, f64::trunc))
}

pub fn int(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(num_arg(ev, &args[0]).map(f64::floor))
}

/// MOD(n, d): the result takes the sign of the divisor.
pub fn modulo(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let n = num_arg(ev, &args[0])?;
        let d = num_arg(ev, &args[1])?;
        if d == 0.0 {
            return Err(CellError::Div0);
        }
        Ok(n - d * (n / d).floor())
    })())
}

pub fn power(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let base = num_arg(ev, &args[0])?;
        let exp = num_arg(ev, &args[1])?;
        if base == 0.0 && exp < 0.0 {
            return Err(CellError::Div0);
        }
        Ok(base.powf(exp))
    })())
}

pub fn sqrt(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(num_arg(ev, &args[0]).and_then(|x| {
        if x < 0.0 {
            Err(CellError::Value)
        } else {
            Ok(x.sqrt())
        }
    }))
}

/// FLOOR(x, [significance]): rounds down to a multiple of significance.
pub fn floor(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let x = num_arg(ev, &args[0])?;
        let sig = opt_num_arg(ev, args, 1, 1.0)?;
        if sig == 0.0 {
            return Err(CellError::Div0);
        }
        if x > 0.0 && sig < 0.0 {
            return Err(CellError::Value);
        }
        Ok(snap(x / sig).floor() * sig)
    })())
}

/// CEILING(x, [significance]): rounds up to a multiple of significance.
pub fn ceiling(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish((|| {
        let x = num_arg(ev, &args[0])?;
        let sig = opt_num_arg(ev, args, 1, 1.0)?;
        if sig == 0.0 {
            return Ok(0.0);
        }
        if x > 0.0 && sig < 0.0 {
            return Err(CellError::Value);
        }
        Ok(snap(x / sig).ceil() * sig)
    })())
}

pub fn sign(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    finish(num_arg(ev, &args[0]).map(|x| {
        if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        }
    }))
}
