//! FILENAME: core/engine/src/functions/criteria.rs
//! PURPOSE: Criteria matching for SUMIF, COUNTIF and AVERAGEIF.
//! CONTEXT: A criterion is either a plain value ("apples", 5, TRUE) or a
//! comparison written as text (">10", "<>done", "=a*"). Text equality
//! supports `*` and `?` wildcards and ignores case.

use crate::evaluator::{compare_values, EvalResult};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A parsed criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    op: Op,
    operand: EvalResult,
}

impl Criterion {
    /// Builds a criterion from an evaluated argument.
    pub fn from_value(value: &EvalResult) -> Criterion {
        match value {
            EvalResult::Text(s) => Criterion::parse(s),
            EvalResult::Empty => Criterion {
                op: Op::Eq,
                operand: EvalResult::Text(String::new()),
            },
            other => Criterion {
                op: Op::Eq,
                operand: other.top_left(),
            },
        }
    }

    /// Parses a textual criterion such as ">=10" or "<>x".
    pub fn parse(text: &str) -> Criterion {
        let (op, rest) = if let Some(rest) = text.strip_prefix(">=") {
            (Op::Ge, rest)
        } else if let Some(rest) = text.strip_prefix("<=") {
            (Op::Le, rest)
        } else if let Some(rest) = text.strip_prefix("<>") {
            (Op::Ne, rest)
        } else if let Some(rest) = text.strip_prefix('>') {
            (Op::Gt, rest)
        } else if let Some(rest) = text.strip_prefix('<') {
            (Op::Lt, rest)
        } else if let Some(rest) = text.strip_prefix('=') {
            (Op::Eq, rest)
        } else {
            (Op::Eq, text)
        };

        let operand = if let Ok(n) = rest.trim().parse::<f64>() {
            EvalResult::Number(n)
        } else if rest.eq_ignore_ascii_case("TRUE") {
            EvalResult::Boolean(true)
        } else if rest.eq_ignore_ascii_case("FALSE") {
            EvalResult::Boolean(false)
        } else {
            EvalResult::Text(rest.to_string())
        };

        Criterion { op, operand }
    }

    /// Tests a cell value against the criterion. Errors never match.
    pub fn matches(&self, value: &EvalResult) -> bool {
        if value.is_error() {
            return false;
        }

        match (&self.operand, self.op) {
            (EvalResult::Text(pattern), Op::Eq | Op::Ne) => {
                let hit = match value {
                    EvalResult::Text(s) => wildcard_match(pattern, s),
                    EvalResult::Empty => pattern.is_empty(),
                    _ => false,
                };
                (self.op == Op::Eq) == hit
            }
            (EvalResult::Number(_), _) => match value {
                // Numeric criteria only compare against numbers
                EvalResult::Number(_) => self.test(compare_values(value, &self.operand)),
                _ => self.op == Op::Ne,
            },
            (EvalResult::Boolean(_), _) => match value {
                EvalResult::Boolean(_) => self.test(compare_values(value, &self.operand)),
                _ => self.op == Op::Ne,
            },
            (EvalResult::Text(_), _) => match value {
                EvalResult::Text(_) => self.test(compare_values(value, &self.operand)),
                _ => false,
            },
            _ => false,
        }
    }

    fn test(&self, ordering: Ordering) -> bool {
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Lt => ordering == Ordering::Less,
            Op::Le => ordering != Ordering::Greater,
            Op::Gt => ordering == Ordering::Greater,
            Op::Ge => ordering != Ordering::Less,
        }
    }
}

/// Case-insensitive match with `*` (any run) and `?` (any one character).
pub(crate) fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            resume = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            resume += 1;
            ti = resume;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> EvalResult {
        EvalResult::Text(s.to_string())
    }

    #[test]
    fn numeric_comparisons() {
        let c = Criterion::parse(">=10");
        assert!(c.matches(&EvalResult::Number(10.0)));
        assert!(!c.matches(&EvalResult::Number(9.5)));
        assert!(!c.matches(&text("abc")));

        let c = Criterion::from_value(&EvalResult::Number(3.0));
        assert!(c.matches(&EvalResult::Number(3.0)));
        assert!(!c.matches(&text("3x")));
    }

    #[test]
    fn text_equality_and_wildcards() {
        let c = Criterion::parse("ap*");
        assert!(c.matches(&text("Apple")));
        assert!(c.matches(&text("apricot")));
        assert!(!c.matches(&text("banana")));

        let c = Criterion::parse("<>b?t");
        assert!(!c.matches(&text("bat")));
        assert!(c.matches(&text("boat")));
        assert!(c.matches(&EvalResult::Number(1.0)));
    }

    #[test]
    fn wildcard_edges() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*c", "abbbc"));
        assert!(!wildcard_match("a?c", "ac"));
        assert!(wildcard_match("*x*", "boxes"));
    }

    #[test]
    fn errors_never_match() {
        let c = Criterion::parse("<>1");
        assert!(!c.matches(&EvalResult::Error(crate::cell::CellError::NA)));
    }
}
