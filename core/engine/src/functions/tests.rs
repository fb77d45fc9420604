//! FILENAME: core/engine/src/functions/tests.rs
//! Function-level tests evaluated against an in-memory sheet.

use crate::cell::{CellError, CellValue};
use crate::evaluator::test_support::MapSource;
use crate::evaluator::EvalResult;

fn n(v: f64) -> CellValue {
    CellValue::Number(v)
}

fn t(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn num(v: f64) -> EvalResult {
    EvalResult::Number(v)
}

fn text(s: &str) -> EvalResult {
    EvalResult::Text(s.to_string())
}

fn err(e: CellError) -> EvalResult {
    EvalResult::Error(e)
}

fn sample() -> MapSource {
    // A: 10, 20, "x", TRUE, (empty), 30
    MapSource::with(&[
        ("A1", n(10.0)),
        ("A2", n(20.0)),
        ("A3", t("x")),
        ("A4", CellValue::Boolean(true)),
        ("A6", n(30.0)),
        ("B1", t("apple")),
        ("B2", t("banana")),
        ("B3", t("apricot")),
        ("B4", t("cherry")),
        ("B6", t("avocado")),
    ])
}

// ========================================
// Aggregates
// ========================================

#[test]
fn sum_skips_text_and_booleans_in_ranges() {
    let src = sample();
    assert_eq!(src.eval("=SUM(A1:A6)"), num(60.0));
    assert_eq!(src.eval("=SUM(A:A)"), num(60.0));
    // Direct arguments are coerced
    assert_eq!(src.eval("=SUM(1, TRUE, \"2\")"), num(4.0));
    assert_eq!(src.eval("=SUM(\"abc\")"), err(CellError::Value));
}

#[test]
fn sum_propagates_errors_from_ranges() {
    let mut src = sample();
    src.set("A5", CellValue::Error(CellError::Div0));
    assert_eq!(src.eval("=SUM(A1:A6)"), err(CellError::Div0));
    assert_eq!(src.eval("=COUNT(A1:A6)"), num(3.0));
}

#[test]
fn average_min_max_product() {
    let src = sample();
    assert_eq!(src.eval("=AVERAGE(A1:A6)"), num(20.0));
    assert_eq!(src.eval("=AVG(A1, A2)"), num(15.0));
    assert_eq!(src.eval("=AVERAGE(B1:B2)"), err(CellError::Div0));
    assert_eq!(src.eval("=MIN(A1:A6)"), num(10.0));
    assert_eq!(src.eval("=MAX(A1:A6, 99)"), num(99.0));
    assert_eq!(src.eval("=MAX(B1:B4)"), num(0.0));
    assert_eq!(src.eval("=PRODUCT(A1, A2, 2)"), num(400.0));
}

#[test]
fn counting() {
    let src = sample();
    assert_eq!(src.eval("=COUNT(A1:A6)"), num(3.0));
    assert_eq!(src.eval("=COUNT(1, \"2\", \"x\")"), num(2.0));
    assert_eq!(src.eval("=COUNTA(A1:A6)"), num(5.0));
    assert_eq!(src.eval("=COUNTBLANK(A1:A6)"), num(1.0));
}

#[test]
fn conditional_aggregates() {
    let src = sample();
    assert_eq!(src.eval("=SUMIF(A1:A6, \">15\")"), num(50.0));
    assert_eq!(src.eval("=COUNTIF(B1:B6, \"a*\")"), num(3.0));
    assert_eq!(src.eval("=COUNTIF(A1:A6, 10)"), num(1.0));
    assert_eq!(src.eval("=SUMIF(B1:B6, \"a*\", A1:A6)"), num(40.0));
    assert_eq!(src.eval("=AVERAGEIF(A1:A6, \">=20\")"), num(25.0));
    assert_eq!(src.eval("=AVERAGEIF(A1:A6, \">100\")"), err(CellError::Div0));
}

// ========================================
// Logical
// ========================================

#[test]
fn if_evaluates_only_the_chosen_branch() {
    let src = sample();
    assert_eq!(src.eval("=IF(A1>5, \"big\", \"small\")"), text("big"));
    assert_eq!(src.eval("=IF(A1>50, \"big\")"), EvalResult::Boolean(false));
    assert_eq!(src.eval("=IF(TRUE, 1, 1/0)"), num(1.0));
    assert_eq!(src.eval("=IF(\"maybe\", 1, 2)"), err(CellError::Value));
}

#[test]
fn boolean_combinators() {
    let src = sample();
    assert_eq!(src.eval("=AND(TRUE, A1>5)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=AND(TRUE, 0)"), EvalResult::Boolean(false));
    assert_eq!(src.eval("=OR(FALSE, A2=20)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=XOR(TRUE, TRUE, TRUE)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=NOT(A1)"), EvalResult::Boolean(false));
    assert_eq!(src.eval("=AND(B1:B2)"), err(CellError::Value));
    assert_eq!(src.eval("=TRUE()"), EvalResult::Boolean(true));
}

#[test]
fn error_trapping() {
    let src = sample();
    assert_eq!(src.eval("=IFERROR(1/0, \"oops\")"), text("oops"));
    assert_eq!(src.eval("=IFERROR(A1, 0)"), num(10.0));
    assert_eq!(src.eval("=IFNA(NA(), 7)"), num(7.0));
    assert_eq!(src.eval("=IFNA(1/0, 7)"), err(CellError::Div0));
}

// ========================================
// Math
// ========================================

#[test]
fn rounding() {
    let src = MapSource::default();
    assert_eq!(src.eval("=ROUND(2.5)"), num(3.0));
    assert_eq!(src.eval("=ROUND(-2.5)"), num(-3.0));
    assert_eq!(src.eval("=ROUND(3.14159, 2)"), num(3.14));
    assert_eq!(src.eval("=ROUND(1234, -2)"), num(1200.0));
    assert_eq!(src.eval("=ROUNDUP(1.1, 1)"), num(1.1));
    assert_eq!(src.eval("=ROUNDUP(1.21, 1)"), num(1.3));
    assert_eq!(src.eval("=ROUNDUP(-1.21, 1)"), num(-1.3));
    assert_eq!(src.eval("=ROUNDDOWN(1.29, 1)"), num(1.2));
    assert_eq!(src.eval("=INT(-1.5)"), num(-2.0));
}

#[test]
fn modulo_power_and_roots() {
    let src = MapSource::default();
    assert_eq!(src.eval("=MOD(10, 3)"), num(1.0));
    assert_eq!(src.eval("=MOD(-10, 3)"), num(2.0));
    assert_eq!(src.eval("=MOD(10, -3)"), num(-2.0));
    assert_eq!(src.eval("=MOD(1, 0)"), err(CellError::Div0));
    assert_eq!(src.eval("=POWER(2, 10)"), num(1024.0));
    assert_eq!(src.eval("=POW(0, -1)"), err(CellError::Div0));
    assert_eq!(src.eval("=SQRT(16)"), num(4.0));
    assert_eq!(src.eval("=SQRT(-1)"), err(CellError::Value));
}

#[test]
fn floor_ceiling_sign() {
    let src = MapSource::default();
    assert_eq!(src.eval("=FLOOR(7.8)"), num(7.0));
    assert_eq!(src.eval("=FLOOR(7, 2)"), num(6.0));
    assert_eq!(src.eval("=FLOOR(7, 0)"), err(CellError::Div0));
    assert_eq!(src.eval("=CEILING(7, 2)"), num(8.0));
    assert_eq!(src.eval("=CEIL(7, 0)"), num(0.0));
    assert_eq!(src.eval("=CEILING(7, -2)"), err(CellError::Value));
    assert_eq!(src.eval("=SIGN(-3)"), num(-1.0));
    assert_eq!(src.eval("=ABS(-3)"), num(3.0));
    assert_eq!(src.eval("=PI()"), num(std::f64::consts::PI));
}

// ========================================
// Lookup
// ========================================

fn table() -> MapSource {
    // D1:F4
    MapSource::with(&[
        ("D1", n(1.0)),
        ("E1", t("one")),
        ("F1", n(100.0)),
        ("D2", n(2.0)),
        ("E2", t("two")),
        ("F2", n(200.0)),
        ("D3", n(5.0)),
        ("E3", t("five")),
        ("F3", n(500.0)),
        ("D4", n(9.0)),
        ("E4", t("nine")),
        ("F4", n(900.0)),
    ])
}

#[test]
fn vlookup_exact_and_approximate() {
    let src = table();
    assert_eq!(src.eval("=VLOOKUP(5, D1:F4, 2, FALSE)"), text("five"));
    assert_eq!(src.eval("=VLOOKUP(4, D1:F4, 3, FALSE)"), err(CellError::NA));
    assert_eq!(src.eval("=VLOOKUP(4, D1:F4, 3)"), num(200.0));
    assert_eq!(src.eval("=VLOOKUP(100, D1:F4, 2, TRUE)"), text("nine"));
    assert_eq!(src.eval("=VLOOKUP(0, D1:F4, 2, TRUE)"), err(CellError::NA));
    assert_eq!(src.eval("=VLOOKUP(5, D1:F4, 0, FALSE)"), err(CellError::Value));
    assert_eq!(src.eval("=VLOOKUP(5, D1:F4, 4, FALSE)"), err(CellError::Ref));
}

#[test]
fn hlookup_reads_rows() {
    let src = table();
    assert_eq!(src.eval("=HLOOKUP(\"two\", E1:E4, 1, FALSE)"), err(CellError::NA));
    assert_eq!(src.eval("=HLOOKUP(1, D1:F2, 2, FALSE)"), num(2.0));
    assert_eq!(src.eval("=HLOOKUP(1, D1:F2, 3, FALSE)"), err(CellError::Ref));
}

#[test]
fn index_and_match() {
    let src = table();
    assert_eq!(src.eval("=INDEX(D1:F4, 3, 2)"), text("five"));
    assert_eq!(src.eval("=INDEX(D1:F1, 3)"), num(100.0));
    assert_eq!(src.eval("=INDEX(D1:F4, 5, 1)"), err(CellError::Ref));
    assert_eq!(src.eval("=SUM(INDEX(D1:F4, 0, 3))"), num(1700.0));
    assert_eq!(src.eval("=MATCH(\"five\", E1:E4, 0)"), num(3.0));
    assert_eq!(src.eval("=MATCH(\"f*\", E1:E4, 0)"), num(3.0));
    assert_eq!(src.eval("=MATCH(6, D1:D4)"), num(3.0));
    assert_eq!(src.eval("=MATCH(6, D1:D4, 0)"), err(CellError::NA));
    assert_eq!(src.eval("=MATCH(1, D1:F4, 0)"), err(CellError::NA));
}

#[test]
fn ranges_past_the_used_extent() {
    let src = sample();
    assert_eq!(src.eval("=SUM(A1:XFD1048576)"), num(60.0));
    assert_eq!(src.eval("=COUNTBLANK(A1:A100000000)"), num(99_999_995.0));
    assert_eq!(src.eval("=COUNTBLANK(C1:C10)"), num(10.0));
    assert_eq!(src.eval("=COUNTBLANK(A:A)"), num(4_294_967_291.0));
    assert_eq!(src.eval("=ROWS(A1:A100000000)"), num(100_000_000.0));

    // Blank-matching criteria count the unread cells too
    assert_eq!(src.eval("=COUNTIF(A1:A1000, \"\")"), num(995.0));
    assert_eq!(src.eval("=COUNTIF(C1:C100, \"\")"), num(100.0));
    assert_eq!(src.eval("=SUMIF(C1:C100, \"\", A1:A100)"), num(60.0));

    // Positions inside the reference but past the data are empty, not #REF!
    assert_eq!(src.eval("=INDEX(A1:A1000, 500)"), EvalResult::Empty);
    assert_eq!(src.eval("=VLOOKUP(10, A1:D1000, 4, FALSE)"), EvalResult::Empty);
    assert_eq!(src.eval("=INDEX(A1:A1000, 1001)"), err(CellError::Ref));
    assert_eq!(src.eval("=MATCH(\"avocado\", B1:B100000, 0)"), num(6.0));
}

#[test]
fn rows_and_columns() {
    let src = table();
    assert_eq!(src.eval("=ROWS(D1:F4)"), num(4.0));
    assert_eq!(src.eval("=COLUMNS(D1:F4)"), num(3.0));
    assert_eq!(src.eval("=ROWS(A:A)"), num(4294967296.0));
    assert_eq!(src.eval("=COLUMNS(B:D)"), num(3.0));
}

// ========================================
// Text
// ========================================

#[test]
fn text_basics() {
    let src = MapSource::with(&[("A1", t("  Hello   World  ")), ("A2", n(42.0))]);
    assert_eq!(src.eval("=TRIM(A1)"), text("Hello World"));
    assert_eq!(src.eval("=LEN(\"héllo\")"), num(5.0));
    assert_eq!(src.eval("=LEN(A2)"), num(2.0));
    assert_eq!(src.eval("=UPPER(\"abc\")"), text("ABC"));
    assert_eq!(src.eval("=LOWER(\"ABC\")"), text("abc"));
    assert_eq!(src.eval("=CONCATENATE(\"n=\", A2, TRUE)"), text("n=42TRUE"));
    assert_eq!(src.eval("=CONCAT(A2:A2, \"!\")"), text("42!"));
}

#[test]
fn substrings() {
    let src = MapSource::default();
    assert_eq!(src.eval("=LEFT(\"spreadsheet\", 6)"), text("spread"));
    assert_eq!(src.eval("=LEFT(\"abc\")"), text("a"));
    assert_eq!(src.eval("=RIGHT(\"spreadsheet\", 5)"), text("sheet"));
    assert_eq!(src.eval("=RIGHT(\"ab\", 10)"), text("ab"));
    assert_eq!(src.eval("=LEFT(\"abc\", -1)"), err(CellError::Value));
    assert_eq!(src.eval("=MID(\"spreadsheet\", 3, 4)"), text("read"));
    assert_eq!(src.eval("=MID(\"abc\", 0, 1)"), err(CellError::Value));
    assert_eq!(src.eval("=REPT(\"ab\", 3)"), text("ababab"));
}

#[test]
fn text_results_are_capped() {
    let src = MapSource::default();
    assert_eq!(src.eval("=REPT(\"ab\", 1E19)"), err(CellError::Value));
    assert_eq!(src.eval("=REPT(\"ab\", 16384)"), err(CellError::Value));
    assert_eq!(
        src.eval("=LEN(REPT(\"ab\", 16383))"),
        num(32766.0)
    );
    assert_eq!(
        src.eval("=REPT(\"a\", 32767) & \"b\""),
        err(CellError::Value)
    );
    assert_eq!(
        src.eval("=CONCATENATE(REPT(\"a\", 20000), REPT(\"b\", 20000))"),
        err(CellError::Value)
    );
    assert_eq!(
        src.eval("=SUBSTITUTE(REPT(\"a\", 1000), \"a\", REPT(\"b\", 100))"),
        err(CellError::Value)
    );
}

#[test]
fn find_substitute_value_exact() {
    let src = MapSource::default();
    assert_eq!(src.eval("=FIND(\"b\", \"abcb\")"), num(2.0));
    assert_eq!(src.eval("=FIND(\"b\", \"abcb\", 3)"), num(4.0));
    assert_eq!(src.eval("=FIND(\"B\", \"abc\")"), err(CellError::Value));
    assert_eq!(src.eval("=SUBSTITUTE(\"a-b-c\", \"-\", \"+\")"), text("a+b+c"));
    assert_eq!(src.eval("=SUBSTITUTE(\"a-b-c\", \"-\", \"+\", 2)"), text("a-b+c"));
    assert_eq!(src.eval("=VALUE(\" 12.5 \")"), num(12.5));
    assert_eq!(src.eval("=VALUE(\"50%\")"), num(0.5));
    assert_eq!(src.eval("=VALUE(\"abc\")"), err(CellError::Value));
    assert_eq!(src.eval("=EXACT(\"a\", \"A\")"), EvalResult::Boolean(false));
}

// ========================================
// Dates and information
// ========================================

#[test]
fn dates() {
    let src = MapSource::default();
    assert_eq!(src.eval("=DATE(2024, 1, 15)"), num(45306.0));
    assert_eq!(src.eval("=DATE(2023, 13, 1)"), src.eval("=DATE(2024, 1, 1)"));
    assert_eq!(src.eval("=DATE(2024, 3, 0)"), src.eval("=DATE(2024, 2, 29)"));
    assert_eq!(src.eval("=YEAR(45306)"), num(2024.0));
    assert_eq!(src.eval("=MONTH(45306)"), num(1.0));
    assert_eq!(src.eval("=DAY(45306)"), num(15.0));
    // 2024-01-15 was a Monday
    assert_eq!(src.eval("=WEEKDAY(45306)"), num(2.0));
    assert_eq!(src.eval("=WEEKDAY(45306, 2)"), num(1.0));
    assert_eq!(src.eval("=WEEKDAY(45306, 3)"), num(0.0));
    assert_eq!(src.eval("=WEEKDAY(45306, 9)"), err(CellError::Value));
    assert_eq!(src.eval("=DAYS(45306, 45296)"), num(10.0));
    assert_eq!(
        src.eval("=EDATE(DATE(2024, 1, 31), 1)"),
        src.eval("=DATE(2024, 2, 29)")
    );
    assert_eq!(src.eval("=YEAR(-1)"), err(CellError::Value));
}

#[test]
fn date_rejects_out_of_range_parts() {
    let src = MapSource::default();
    assert_eq!(src.eval("=DATE(2020, 1E19, 1)"), err(CellError::Value));
    assert_eq!(src.eval("=DATE(2020, -1E19, 1)"), err(CellError::Value));
    assert_eq!(src.eval("=DATE(2020, 1, -1E19)"), err(CellError::Value));
    assert_eq!(src.eval("=DATE(2020, 1, 1E19)"), err(CellError::Value));
    assert_eq!(src.eval("=DATE(9999, 12, 32)"), err(CellError::Value));
    assert_eq!(src.eval("=DATE(9999, 12, 31)"), num(2958465.0));
    assert_eq!(src.eval("=EDATE(45306, 1E19)"), err(CellError::Value));
}

#[test]
fn information() {
    let src = sample();
    assert_eq!(src.eval("=ISNUMBER(A1)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=ISTEXT(A3)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=ISBLANK(A5)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=ISERROR(1/0)"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=ISNA(NA())"), EvalResult::Boolean(true));
    assert_eq!(src.eval("=ISNA(1/0)"), EvalResult::Boolean(false));
    assert_eq!(src.eval("=NA()"), err(CellError::NA));
}

#[test]
fn arity_and_unknown_functions() {
    let src = MapSource::default();
    assert_eq!(src.eval("=IF(TRUE)"), err(CellError::Value));
    assert_eq!(src.eval("=ABS(1, 2)"), err(CellError::Value));
    assert_eq!(src.eval("=NOPE(1)"), err(CellError::Name));
}
