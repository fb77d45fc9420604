//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct, the `CellValue` enum and the
//! `CellContent` input type. It separates the user's input (formula) from the
//! calculated result (value). A formula cell also caches its parsed AST so
//! recalculation never re-parses.

use parser::{is_formula, Expression};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the possible errors a cell can hold (e.g., #DIV/0!)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellError {
    Div0,     // Division by zero
    Ref,      // Invalid reference
    Name,     // Unknown function or variable name
    Value,    // Wrong type of argument
    NA,       // Value not available (lookups)
    Circular, // Circular dependency detected
}

impl CellError {
    /// The spreadsheet spelling of the error, e.g. `#DIV/0!`.
    pub fn code(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Value => "#VALUE!",
            CellError::NA => "#N/A",
            CellError::Circular => "#CIRCULAR!",
        }
    }

    /// Parses an error literal (case-insensitive).
    pub fn from_code(code: &str) -> Option<CellError> {
        match code.trim().to_uppercase().as_str() {
            "#DIV/0!" => Some(CellError::Div0),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#VALUE!" => Some(CellError::Value),
            "#N/A" => Some(CellError::NA),
            "#CIRCULAR!" => Some(CellError::Circular),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Represents the calculated result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_error(&self) -> Option<CellError> {
        match self {
            CellValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the display value as a String.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.code().to_string(),
        }
    }
}

/// Formats a number without unnecessary decimal places.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// What a caller writes into a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Empty,
    Value(CellValue),
    /// Formula source including the leading `=`.
    Formula(String),
}

impl CellContent {
    /// Interprets raw user input: `=...` is a formula, then numbers, booleans
    /// and error literals; anything else is text. Empty input clears the cell.
    pub fn from_input(raw: &str) -> CellContent {
        if raw.is_empty() {
            return CellContent::Empty;
        }
        if is_formula(raw) {
            return CellContent::Formula(raw.to_string());
        }
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellContent::Value(CellValue::Number(n));
            }
        }
        if trimmed.eq_ignore_ascii_case("TRUE") {
            return CellContent::Value(CellValue::Boolean(true));
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return CellContent::Value(CellValue::Boolean(false));
        }
        if let Some(err) = CellError::from_code(trimmed) {
            return CellContent::Value(CellValue::Error(err));
        }
        CellContent::Value(CellValue::Text(raw.to_string()))
    }
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub formula: Option<String>,
    pub value: CellValue,
    /// Parsed formula, present exactly when `formula` is.
    #[serde(skip)]
    pub ast: Option<Expression>,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            formula: None,
            value: CellValue::Empty,
            ast: None,
        }
    }

    pub fn new_value(value: CellValue) -> Self {
        Cell {
            formula: None,
            value,
            ast: None,
        }
    }

    pub fn new_number(num: f64) -> Self {
        Cell::new_value(CellValue::Number(num))
    }

    pub fn new_text(text: String) -> Self {
        Cell::new_value(CellValue::Text(text))
    }

    /// A formula cell with its parsed AST. The value stays empty until the
    /// first recalculation.
    pub fn new_formula(formula: String, ast: Expression) -> Self {
        Cell {
            formula: Some(formula),
            value: CellValue::Empty,
            ast: Some(ast),
        }
    }

    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// The content that produced this cell, suitable for writing back.
    pub fn content(&self) -> CellContent {
        match &self.formula {
            Some(src) => CellContent::Formula(src.clone()),
            None if self.value.is_empty() => CellContent::Empty,
            None => CellContent::Value(self.value.clone()),
        }
    }

    /// Returns the display value of the cell as a String.
    pub fn display_value(&self) -> String {
        self.value.display_value()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.formula == other.formula && self.value == other.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_classification() {
        assert_eq!(CellContent::from_input(""), CellContent::Empty);
        assert_eq!(
            CellContent::from_input("=A1+1"),
            CellContent::Formula("=A1+1".to_string())
        );
        assert_eq!(
            CellContent::from_input(" 12.5 "),
            CellContent::Value(CellValue::Number(12.5))
        );
        assert_eq!(
            CellContent::from_input("true"),
            CellContent::Value(CellValue::Boolean(true))
        );
        assert_eq!(
            CellContent::from_input("#n/a"),
            CellContent::Value(CellValue::Error(CellError::NA))
        );
        assert_eq!(
            CellContent::from_input("North"),
            CellContent::Value(CellValue::Text("North".to_string()))
        );
        // A lone marker is text, not an empty formula
        assert_eq!(
            CellContent::from_input("="),
            CellContent::Value(CellValue::Text("=".to_string()))
        );
    }

    #[test]
    fn error_codes_roundtrip() {
        for err in [
            CellError::Div0,
            CellError::Ref,
            CellError::Name,
            CellError::Value,
            CellError::NA,
            CellError::Circular,
        ] {
            assert_eq!(CellError::from_code(err.code()), Some(err));
        }
        assert_eq!(CellError::from_code("#NOPE"), None);
    }

    #[test]
    fn display_values() {
        assert_eq!(CellValue::Number(3.0).display_value(), "3");
        assert_eq!(CellValue::Number(2.5).display_value(), "2.5");
        assert_eq!(CellValue::Error(CellError::Div0).display_value(), "#DIV/0!");
        assert_eq!(CellValue::Boolean(false).display_value(), "FALSE");
    }
}
