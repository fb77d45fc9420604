//! FILENAME: core/engine/src/evaluator.rs
//! PURPOSE: Evaluates AST expressions to compute cell values.
//! CONTEXT: After a formula is parsed into an AST, this module traverses
//! the tree and computes the final result. It handles cell lookups,
//! arithmetic operations, comparisons, string concatenation, and
//! dispatches built-in function calls to `crate::functions`.
//!
//! SUPPORTED FEATURES:
//! - Literal evaluation: Numbers, Strings, Booleans, Error literals
//! - Cell reference lookup through a `CellSource` (including cross-sheet references)
//! - Range expansion into 2D arrays for functions
//! - Column references (A:A, A:B) and row references (1:1, 1:5)
//! - Every range is read only up to the used extent of its sheet; `Table`
//!   keeps the referenced size for functions that care about geometry
//! - Workbook variables (names)
//! - Binary operations: +, -, *, /, ^, &, =, <>, <, >, <=, >=
//! - Unary operations: - (negation), + (identity), % (percent)
//!
//! Evaluation only reads the source, so the same snapshot always produces the
//! same result.

use crate::cell::{format_number, CellError, CellValue};
use crate::coord::{CellKey, CellRange};
use crate::dependency_extractor::{resolve_cell, resolve_range, SheetLookup};
use crate::functions;
use parser::{BinaryOperator, Expression, UnaryOperator, Value};
use std::cmp::Ordering;

/// Read access to cell values for the evaluator.
pub trait CellSource: SheetLookup {
    /// The stored value at `key`, or None when nothing is stored there.
    fn cell_value(&self, key: CellKey) -> Option<&CellValue>;

    /// Highest used (row, col) of a sheet, or None if the sheet does not exist.
    fn sheet_extent(&self, sheet: u32) -> Option<(u32, u32)>;

    /// Value of a workbook variable (name is upper-cased).
    fn variable(&self, name: &str) -> Option<&CellValue>;
}

/// The result of evaluating an expression.
/// This maps directly to CellValue but is separate to allow for
/// intermediate computation states.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
    /// A reference to a cell with no content.
    Empty,
    /// Rows of values, produced by range references.
    Array(Vec<Vec<EvalResult>>),
}

impl EvalResult {
    pub fn from_cell_value(value: &CellValue) -> EvalResult {
        match value {
            CellValue::Empty => EvalResult::Empty,
            CellValue::Number(n) => EvalResult::Number(*n),
            CellValue::Text(s) => EvalResult::Text(s.clone()),
            CellValue::Boolean(b) => EvalResult::Boolean(*b),
            CellValue::Error(e) => EvalResult::Error(*e),
        }
    }

    /// Converts the evaluation result to a CellValue for storage.
    /// Empty becomes 0 and arrays collapse to their top-left value.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            EvalResult::Number(n) if !n.is_finite() => CellValue::Error(CellError::Value),
            EvalResult::Number(n) => CellValue::Number(*n),
            EvalResult::Text(s) => CellValue::Text(s.clone()),
            EvalResult::Boolean(b) => CellValue::Boolean(*b),
            EvalResult::Error(e) => CellValue::Error(*e),
            EvalResult::Empty => CellValue::Number(0.0),
            EvalResult::Array(_) => self.top_left().to_cell_value(),
        }
    }

    /// The first element of an array (or the value itself).
    pub fn top_left(&self) -> EvalResult {
        match self {
            EvalResult::Array(rows) => rows
                .first()
                .and_then(|row| row.first())
                .map(|v| v.top_left())
                .unwrap_or(EvalResult::Empty),
            other => other.clone(),
        }
    }

    /// Coerces to a number: booleans are 1/0, empty is 0, numeric text is
    /// parsed and anything else is #VALUE!. Errors pass through.
    pub fn to_number(&self) -> Result<f64, CellError> {
        match self {
            EvalResult::Number(n) => Ok(*n),
            EvalResult::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            EvalResult::Empty => Ok(0.0),
            EvalResult::Text(s) => s.trim().parse::<f64>().map_err(|_| CellError::Value),
            EvalResult::Error(e) => Err(*e),
            EvalResult::Array(_) => self.top_left().to_number(),
        }
    }

    /// Coerces to a boolean: numbers are true when non-zero, empty is false,
    /// and only the texts TRUE/FALSE are accepted.
    pub fn to_boolean(&self) -> Result<bool, CellError> {
        match self {
            EvalResult::Boolean(b) => Ok(*b),
            EvalResult::Number(n) => Ok(*n != 0.0),
            EvalResult::Empty => Ok(false),
            EvalResult::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(CellError::Value)
                }
            }
            EvalResult::Error(e) => Err(*e),
            EvalResult::Array(_) => self.top_left().to_boolean(),
        }
    }

    /// Coerces to text. Errors pass through.
    pub fn to_text(&self) -> Result<String, CellError> {
        match self {
            EvalResult::Number(n) => Ok(format_number(*n)),
            EvalResult::Text(s) => Ok(s.clone()),
            EvalResult::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            EvalResult::Empty => Ok(String::new()),
            EvalResult::Error(e) => Err(*e),
            EvalResult::Array(_) => self.top_left().to_text(),
        }
    }

    /// Returns true if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, EvalResult::Error(_))
    }

    /// Flattens an array result into individual values in row-major order.
    /// Non-array values return a single-element vector.
    pub fn flatten(&self) -> Vec<EvalResult> {
        match self {
            EvalResult::Array(rows) => rows
                .iter()
                .flat_map(|row| row.iter().flat_map(|v| v.flatten()))
                .collect(),
            other => vec![other.clone()],
        }
    }

    /// Type rank for mixed comparisons: numbers < text < booleans.
    fn type_rank(&self) -> u8 {
        match self {
            EvalResult::Number(_) | EvalResult::Empty => 0,
            EvalResult::Text(_) => 1,
            EvalResult::Boolean(_) => 2,
            EvalResult::Error(_) | EvalResult::Array(_) => 3,
        }
    }
}

/// Values of a range or array argument. `rows` holds only the part inside
/// the sheet's used extent; `height` and `width` are the referenced size.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<EvalResult>>,
    pub height: u64,
    pub width: u64,
}

impl Table {
    /// Value at a 0-based offset. Offsets past the stored part are empty.
    pub fn get(&self, row: usize, col: usize) -> EvalResult {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(EvalResult::Empty)
    }

    pub fn cell_count(&self) -> u64 {
        self.height * self.width
    }

    /// Stored values, row by row.
    pub fn stored(&self) -> impl Iterator<Item = &EvalResult> {
        self.rows.iter().flatten()
    }
}

/// Spreadsheet ordering of two scalar values. Text compares case-insensitively;
/// an empty cell takes the type of the other side.
pub fn compare_values(left: &EvalResult, right: &EvalResult) -> Ordering {
    match (left, right) {
        (EvalResult::Empty, EvalResult::Text(s)) => "".cmp(s.to_lowercase().as_str()),
        (EvalResult::Text(s), EvalResult::Empty) => s.to_lowercase().as_str().cmp(""),
        (EvalResult::Empty, EvalResult::Boolean(b)) => false.cmp(b),
        (EvalResult::Boolean(b), EvalResult::Empty) => b.cmp(&false),
        (EvalResult::Number(l), EvalResult::Number(r)) => {
            if (l - r).abs() < f64::EPSILON {
                Ordering::Equal
            } else {
                l.partial_cmp(r).unwrap_or(Ordering::Equal)
            }
        }
        (EvalResult::Number(l), EvalResult::Empty) => l.partial_cmp(&0.0).unwrap_or(Ordering::Equal),
        (EvalResult::Empty, EvalResult::Number(r)) => 0.0.partial_cmp(r).unwrap_or(Ordering::Equal),
        (EvalResult::Empty, EvalResult::Empty) => Ordering::Equal,
        (EvalResult::Text(l), EvalResult::Text(r)) => l.to_lowercase().cmp(&r.to_lowercase()),
        (EvalResult::Boolean(l), EvalResult::Boolean(r)) => l.cmp(r),
        _ => left.type_rank().cmp(&right.type_rank()),
    }
}

/// The formula evaluator.
/// Holds a reference to the cell source and the sheet the formula lives on.
pub struct Evaluator<'a> {
    source: &'a dyn CellSource,
    current_sheet: u32,
}

impl<'a> Evaluator<'a> {
    pub fn new(source: &'a dyn CellSource, current_sheet: u32) -> Self {
        Evaluator {
            source,
            current_sheet,
        }
    }

    pub fn current_sheet(&self) -> u32 {
        self.current_sheet
    }

    /// Evaluates an AST expression and returns the result.
    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        match expr {
            Expression::Literal(value) => self.eval_literal(value),
            Expression::CellRef {
                sheet, col, row, ..
            } => self.eval_cell_ref(sheet, col, *row),
            Expression::Range { .. } | Expression::ColumnRef { .. } | Expression::RowRef { .. } => {
                match self.resolve_range(expr) {
                    Ok(range) => self.eval_range(&range),
                    Err(e) => EvalResult::Error(e),
                }
            }
            Expression::Name(name) => match self.source.variable(&name.to_uppercase()) {
                Some(value) => EvalResult::from_cell_value(value),
                None => EvalResult::Error(CellError::Name),
            },
            Expression::BinaryOp { left, op, right } => self.eval_binary_op(left, *op, right),
            Expression::UnaryOp { op, operand } => self.eval_unary_op(*op, operand),
            Expression::FunctionCall { func, args } => functions::call(self, func, args),
        }
    }

    /// Evaluates to a single value: arrays collapse to their top-left value.
    pub fn eval_scalar(&self, expr: &Expression) -> EvalResult {
        match self.evaluate(expr) {
            EvalResult::Array(rows) => EvalResult::Array(rows).top_left(),
            other => other,
        }
    }

    /// Evaluates to rows of values. Scalars become a 1x1 array.
    pub fn eval_array(&self, expr: &Expression) -> Result<Vec<Vec<EvalResult>>, CellError> {
        match self.evaluate(expr) {
            EvalResult::Array(rows) => Ok(rows),
            EvalResult::Error(e) => Err(e),
            other => Ok(vec![vec![other]]),
        }
    }

    /// Resolves a reference node to its rectangle without reading any cells.
    pub fn resolve_range(&self, expr: &Expression) -> Result<CellRange, CellError> {
        resolve_range(expr, self.current_sheet, self.source)
    }

    /// Evaluates a literal value.
    fn eval_literal(&self, value: &Value) -> EvalResult {
        match value {
            Value::Number(n) => EvalResult::Number(*n),
            Value::String(s) => EvalResult::Text(s.clone()),
            Value::Boolean(b) => EvalResult::Boolean(*b),
            Value::Error(code) => {
                EvalResult::Error(CellError::from_code(code).unwrap_or(CellError::Value))
            }
        }
    }

    /// Evaluates a cell reference by looking up its value in the source.
    fn eval_cell_ref(&self, sheet: &Option<String>, col: &str, row: u32) -> EvalResult {
        match resolve_cell(sheet, col, row, self.current_sheet, self.source) {
            Ok(key) => match self.source.cell_value(key) {
                Some(value) => EvalResult::from_cell_value(value),
                None => EvalResult::Empty,
            },
            Err(e) => EvalResult::Error(e),
        }
    }

    /// Evaluates to a `Table`. Range references keep their full size even
    /// though only the used part of the sheet is read.
    pub fn eval_table(&self, expr: &Expression) -> Result<Table, CellError> {
        let range = match expr {
            Expression::Range { .. } | Expression::ColumnRef { .. } | Expression::RowRef { .. } => {
                Some(self.resolve_range(expr)?)
            }
            _ => None,
        };
        let rows = self.eval_array(expr)?;
        let (height, width) = match range {
            Some(range) => (range.rows(), range.cols()),
            None => (rows.len() as u64, rows.first().map_or(0, |r| r.len()) as u64),
        };
        Ok(Table {
            rows,
            height,
            width,
        })
    }

    /// Reads a rectangle into rows of values, clipped to the used extent of
    /// the sheet. Cells past the extent are empty and are not materialised.
    fn eval_range(&self, range: &CellRange) -> EvalResult {
        let (max_row, max_col) = match self.source.sheet_extent(range.sheet) {
            Some(extent) => extent,
            None => return EvalResult::Error(CellError::Ref),
        };

        let end_row = range.end_row.min(max_row);
        let end_col = range.end_col.min(max_col);

        if range.start_row > end_row || range.start_col > end_col {
            return EvalResult::Array(Vec::new());
        }

        let rows = (range.start_row..=end_row)
            .map(|row| {
                (range.start_col..=end_col)
                    .map(|col| {
                        match self.source.cell_value(CellKey::new(range.sheet, row, col)) {
                            Some(value) => EvalResult::from_cell_value(value),
                            None => EvalResult::Empty,
                        }
                    })
                    .collect()
            })
            .collect();

        EvalResult::Array(rows)
    }

    /// Evaluates a binary operation.
    fn eval_binary_op(&self, left: &Expression, op: BinaryOperator, right: &Expression) -> EvalResult {
        let left_val = self.eval_scalar(left);
        let right_val = self.eval_scalar(right);

        // Propagate errors
        if let EvalResult::Error(e) = left_val {
            return EvalResult::Error(e);
        }
        if let EvalResult::Error(e) = right_val {
            return EvalResult::Error(e);
        }

        match op {
            BinaryOperator::Add => self.eval_arithmetic(&left_val, &right_val, |l, r| Ok(l + r)),
            BinaryOperator::Subtract => self.eval_arithmetic(&left_val, &right_val, |l, r| Ok(l - r)),
            BinaryOperator::Multiply => self.eval_arithmetic(&left_val, &right_val, |l, r| Ok(l * r)),
            BinaryOperator::Divide => self.eval_arithmetic(&left_val, &right_val, |l, r| {
                if r == 0.0 {
                    Err(CellError::Div0)
                } else {
                    Ok(l / r)
                }
            }),
            BinaryOperator::Power => self.eval_arithmetic(&left_val, &right_val, power),

            // String concatenation
            BinaryOperator::Concat => match (left_val.to_text(), right_val.to_text()) {
                (Ok(l), Ok(r)) => match functions::concat_text(l, &r) {
                    Ok(s) => EvalResult::Text(s),
                    Err(e) => EvalResult::Error(e),
                },
                (Err(e), _) | (_, Err(e)) => EvalResult::Error(e),
            },

            // Comparison operations
            BinaryOperator::Equal => self.eval_comparison(&left_val, &right_val, |o| o == Ordering::Equal),
            BinaryOperator::NotEqual => self.eval_comparison(&left_val, &right_val, |o| o != Ordering::Equal),
            BinaryOperator::LessThan => self.eval_comparison(&left_val, &right_val, |o| o == Ordering::Less),
            BinaryOperator::GreaterThan => {
                self.eval_comparison(&left_val, &right_val, |o| o == Ordering::Greater)
            }
            BinaryOperator::LessEqual => {
                self.eval_comparison(&left_val, &right_val, |o| o != Ordering::Greater)
            }
            BinaryOperator::GreaterEqual => {
                self.eval_comparison(&left_val, &right_val, |o| o != Ordering::Less)
            }
        }
    }

    fn eval_arithmetic<F>(&self, left: &EvalResult, right: &EvalResult, f: F) -> EvalResult
    where
        F: Fn(f64, f64) -> Result<f64, CellError>,
    {
        let result = left
            .to_number()
            .and_then(|l| right.to_number().and_then(|r| f(l, r)));
        number_result(result)
    }

    fn eval_comparison<F>(&self, left: &EvalResult, right: &EvalResult, test: F) -> EvalResult
    where
        F: Fn(Ordering) -> bool,
    {
        EvalResult::Boolean(test(compare_values(left, right)))
    }

    /// Evaluates a unary operation.
    fn eval_unary_op(&self, op: UnaryOperator, operand: &Expression) -> EvalResult {
        let val = self.eval_scalar(operand);

        if let EvalResult::Error(e) = val {
            return EvalResult::Error(e);
        }

        match op {
            UnaryOperator::Negate => number_result(val.to_number().map(|n| -n)),
            UnaryOperator::Plus => match val {
                // Unary plus leaves text as text
                EvalResult::Empty => EvalResult::Number(0.0),
                other => other,
            },
            UnaryOperator::Percent => number_result(val.to_number().map(|n| n / 100.0)),
        }
    }
}

fn power(base: f64, exp: f64) -> Result<f64, CellError> {
    if base == 0.0 && exp < 0.0 {
        return Err(CellError::Div0);
    }
    Ok(base.powf(exp))
}

/// Wraps a numeric computation, turning non-finite results into #VALUE!.
pub fn number_result(result: Result<f64, CellError>) -> EvalResult {
    match result {
        Ok(n) if n.is_finite() => EvalResult::Number(n),
        Ok(_) => EvalResult::Error(CellError::Value),
        Err(e) => EvalResult::Error(e),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::MapSource;
    use super::*;

    fn n(v: f64) -> CellValue {
        CellValue::Number(v)
    }

    #[test]
    fn arithmetic_and_precedence() {
        let src = MapSource::with(&[("A1", n(5.0)), ("A2", n(10.0))]);
        assert_eq!(src.eval("=A1+A2"), EvalResult::Number(15.0));
        assert_eq!(src.eval("=1+2*3"), EvalResult::Number(7.0));
        assert_eq!(src.eval("=2^3^2"), EvalResult::Number(512.0));
        assert_eq!(src.eval("=-2^2"), EvalResult::Number(-4.0));
        assert_eq!(src.eval("=50%"), EvalResult::Number(0.5));
    }

    #[test]
    fn division_by_zero_and_non_finite() {
        let src = MapSource::default();
        assert_eq!(src.eval("=1/0"), EvalResult::Error(CellError::Div0));
        assert_eq!(src.eval("=0/0"), EvalResult::Error(CellError::Div0));
        assert_eq!(src.eval("=10^400"), EvalResult::Error(CellError::Value));
        assert_eq!(src.eval("=(-8)^0.5"), EvalResult::Error(CellError::Value));
    }

    #[test]
    fn empty_cells_coerce() {
        let src = MapSource::default();
        assert_eq!(src.eval("=A1+1"), EvalResult::Number(1.0));
        assert_eq!(src.eval("=A1&\"x\""), EvalResult::Text("x".to_string()));
        assert_eq!(src.eval("=A1").to_cell_value(), CellValue::Number(0.0));
        assert_eq!(src.eval("=A1=0"), EvalResult::Boolean(true));
        assert_eq!(src.eval("=A1=\"\""), EvalResult::Boolean(true));
    }

    #[test]
    fn text_coercion_in_arithmetic() {
        let src = MapSource::with(&[("A1", CellValue::Text("4".into())), ("A2", CellValue::Text("x".into()))]);
        assert_eq!(src.eval("=A1*2"), EvalResult::Number(8.0));
        assert_eq!(src.eval("=A2*2"), EvalResult::Error(CellError::Value));
        assert_eq!(src.eval("=TRUE+1"), EvalResult::Number(2.0));
    }

    #[test]
    fn errors_propagate() {
        let src = MapSource::with(&[("A1", CellValue::Error(CellError::Div0))]);
        assert_eq!(src.eval("=A1+1"), EvalResult::Error(CellError::Div0));
        assert_eq!(src.eval("=-A1"), EvalResult::Error(CellError::Div0));
        assert_eq!(src.eval("=#N/A&\"x\""), EvalResult::Error(CellError::NA));
    }

    #[test]
    fn comparisons() {
        let src = MapSource::default();
        assert_eq!(src.eval("=\"abc\"=\"ABC\""), EvalResult::Boolean(true));
        assert_eq!(src.eval("=\"a\"<\"b\""), EvalResult::Boolean(true));
        // numbers < text < booleans
        assert_eq!(src.eval("=1<\"a\""), EvalResult::Boolean(true));
        assert_eq!(src.eval("=\"z\"<FALSE"), EvalResult::Boolean(true));
        assert_eq!(src.eval("=2<>2"), EvalResult::Boolean(false));
        assert_eq!(src.eval("=3>=3"), EvalResult::Boolean(true));
    }

    #[test]
    fn ranges_become_arrays() {
        let src = MapSource::with(&[("A1", n(1.0)), ("B2", n(4.0))]);
        assert_eq!(
            src.eval("=A1:B2"),
            EvalResult::Array(vec![
                vec![EvalResult::Number(1.0), EvalResult::Empty],
                vec![EvalResult::Empty, EvalResult::Number(4.0)],
            ])
        );
        // Whole columns are clipped to the used rows
        match src.eval("=B:B") {
            EvalResult::Array(rows) => assert_eq!(rows.len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn names_and_bad_references() {
        let mut src = MapSource::default();
        src.variables.insert("RATE".to_string(), n(0.25));
        assert_eq!(src.eval("=Rate*100"), EvalResult::Number(25.0));
        assert_eq!(src.eval("=Missing+1"), EvalResult::Error(CellError::Name));
        assert_eq!(src.eval("=Other!A1"), EvalResult::Error(CellError::Ref));
        assert_eq!(src.eval("=Sheet1!A1+2"), EvalResult::Number(2.0));
    }
}
