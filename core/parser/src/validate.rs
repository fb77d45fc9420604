//! FILENAME: core/parser/src/validate.rs
//! PURPOSE: Static checks over a formula without evaluating it.
//! CONTEXT: Used by the validate-formula operation. A formula that parses can
//! still be unusable (unknown function, wrong argument count); those problems
//! are reported here as diagnostics instead of surfacing as in-cell errors.

use crate::ast::Expression;
use crate::functions::BuiltinFunction;
use crate::parser::parse;
use serde::Serialize;

/// Result of checking a formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaCheck {
    pub valid: bool,
    pub diagnostics: Vec<String>,
    /// Character offset of a parse failure, if any.
    pub position: Option<usize>,
}

/// Parses `input` and checks every function call against the registry.
pub fn validate(input: &str) -> FormulaCheck {
    match parse(input) {
        Ok(expr) => {
            let diagnostics = call_diagnostics(&expr);
            FormulaCheck {
                valid: diagnostics.is_empty(),
                diagnostics,
                position: None,
            }
        }
        Err(err) => FormulaCheck {
            valid: false,
            diagnostics: vec![err.message],
            position: Some(err.position),
        },
    }
}

/// Collects unknown-function and arity problems, in tree order.
pub fn call_diagnostics(expr: &Expression) -> Vec<String> {
    let mut out = Vec::new();
    expr.for_each_call(&mut |func: &BuiltinFunction, args: &[Expression]| match func.signature() {
        None => out.push(format!("Unknown function {}", func.name())),
        Some(sig) if !sig.accepts(args.len()) => {
            let expected = match sig.max_args {
                Some(max) if max == sig.min_args => format!("{}", max),
                Some(max) => format!("{} to {}", sig.min_args, max),
                None => format!("at least {}", sig.min_args),
            };
            out.push(format!(
                "{} expects {} argument(s), got {}",
                sig.name,
                expected,
                args.len()
            ));
        }
        Some(_) => {}
    });
    out
}
