//! FILENAME: core/engine/src/functions/text.rs
//! PURPOSE: Text functions. Positions and lengths count characters, not bytes.

use super::{check_text_len, num_arg, opt_num_arg, text_arg};
use crate::cell::CellError;
use crate::evaluator::{EvalResult, Evaluator};
use parser::Expression;

fn text_result(r: Result<String, CellError>) -> EvalResult {
    match r {
        Ok(s) => EvalResult::Text(s),
        Err(e) => EvalResult::Error(e),
    }
}

/// Reads a non-negative count argument.
fn count_arg(ev: &Evaluator, args: &[Expression], index: usize, default: f64) -> Result<usize, CellError> {
    let n = opt_num_arg(ev, args, index, default)?.trunc();
    if n < 0.0 {
        return Err(CellError::Value);
    }
    Ok(n as usize)
}

pub fn len(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match text_arg(ev, &args[0]) {
        Ok(s) => EvalResult::Number(s.chars().count() as f64),
        Err(e) => EvalResult::Error(e),
    }
}

pub fn upper(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result(text_arg(ev, &args[0]).map(|s| s.to_uppercase()))
}

pub fn lower(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result(text_arg(ev, &args[0]).map(|s| s.to_lowercase()))
}

/// Removes leading and trailing spaces and collapses inner runs to one.
pub fn trim(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result(text_arg(ev, &args[0]).map(|s| {
        s.split(' ')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }))
}

/// Joins every argument; ranges contribute each cell in row-major order.
/// Joins two texts, or `#VALUE!` when the result would be too long.
pub(crate) fn concat_text(left: String, right: &str) -> Result<String, CellError> {
    check_text_len(left.chars().count() + right.chars().count())?;
    Ok(left + right)
}

pub fn concatenate(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let mut out = String::new();
        for arg in args {
            for item in ev.evaluate(arg).flatten() {
                out = concat_text(out, &item.to_text()?)?;
            }
        }
        Ok(out)
    })())
}

pub fn left(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let s = text_arg(ev, &args[0])?;
        let n = count_arg(ev, args, 1, 1.0)?;
        Ok(s.chars().take(n).collect())
    })())
}

pub fn right(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let s = text_arg(ev, &args[0])?;
        let n = count_arg(ev, args, 1, 1.0)?;
        let total = s.chars().count();
        Ok(s.chars().skip(total.saturating_sub(n)).collect())
    })())
}

/// MID(text, start, count) with a 1-based start.
pub fn mid(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let s = text_arg(ev, &args[0])?;
        let start = num_arg(ev, &args[1])?.trunc();
        if start < 1.0 {
            return Err(CellError::Value);
        }
        let n = count_arg(ev, args, 2, 0.0)?;
        Ok(s.chars().skip(start as usize - 1).take(n).collect())
    })())
}

pub fn rept(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let s = text_arg(ev, &args[0])?;
        let n = count_arg(ev, args, 1, 0.0)?;
        let total = s.chars().count().checked_mul(n).ok_or(CellError::Value)?;
        check_text_len(total)?;
        Ok(s.repeat(n))
    })())
}

/// FIND(needle, haystack, [start]): case-sensitive, 1-based.
pub fn find(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let r = (|| {
        let needle: Vec<char> = text_arg(ev, &args[0])?.chars().collect();
        let haystack: Vec<char> = text_arg(ev, &args[1])?.chars().collect();
        let start = opt_num_arg(ev, args, 2, 1.0)?.trunc();
        if start < 1.0 || start as usize > haystack.len() + 1 {
            return Err(CellError::Value);
        }

        let from = start as usize - 1;
        if needle.is_empty() {
            return Ok(start);
        }
        (from..haystack.len())
            .find(|&i| haystack[i..].starts_with(&needle))
            .map(|i| (i + 1) as f64)
            .ok_or(CellError::Value)
    })();
    super::finish(r)
}

/// SUBSTITUTE(text, old, new, [instance]). Without an instance every
/// occurrence is replaced.
pub fn substitute(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    text_result((|| {
        let text = text_arg(ev, &args[0])?;
        let old = text_arg(ev, &args[1])?;
        let new = text_arg(ev, &args[2])?;
        if old.is_empty() {
            return Ok(text);
        }
        let hits = text.matches(old.as_str()).count();
        let (old_len, new_len) = (old.chars().count(), new.chars().count());
        if new_len > old_len {
            check_text_len(text.chars().count() + hits * (new_len - old_len))?;
        }

        let instance = match args.get(3) {
            Some(expr) => {
                let n = num_arg(ev, expr)?.trunc();
                if n < 1.0 {
                    return Err(CellError::Value);
                }
                n as usize
            }
            None => return Ok(text.replace(&old, &new)),
        };

        match text.match_indices(&old).nth(instance - 1) {
            Some((at, _)) => {
                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..at]);
                out.push_str(&new);
                out.push_str(&text[at + old.len()..]);
                Ok(out)
            }
            None => Ok(text),
        }
    })())
}

/// VALUE(text): parses numbers and percentages.
pub fn value(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    let r = match ev.eval_scalar(&args[0]) {
        EvalResult::Number(n) => Ok(n),
        EvalResult::Empty => Ok(0.0),
        EvalResult::Error(e) => Err(e),
        EvalResult::Text(s) => {
            let t = s.trim();
            match t.strip_suffix('%') {
                Some(body) => body.trim().parse::<f64>().map(|n| n / 100.0),
                None => t.parse::<f64>(),
            }
            .map_err(|_| CellError::Value)
        }
        _ => Err(CellError::Value),
    };
    super::finish(r)
}

/// EXACT(a, b): case-sensitive comparison.
pub fn exact(ev: &Evaluator, args: &[Expression]) -> EvalResult {
    match (text_arg(ev, &args[0]), text_arg(ev, &args[1])) {
        (Ok(a), Ok(b)) => EvalResult::Boolean(a == b),
        (Err(e), _) | (_, Err(e)) => EvalResult::Error(e),
    }
}
