//! FILENAME: core/parser/src/functions.rs
//! PURPOSE: The static function registry.
//! CONTEXT: Function names are resolved to `BuiltinFunction` while parsing,
//! so the evaluator dispatches on a closed enum instead of strings. New
//! functions are added by extending the enum and the `CATALOG` table.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Built-in spreadsheet functions resolved at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    // Aggregate functions
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountA,
    CountBlank,
    Product,
    SumIf,
    CountIf,
    AverageIf,

    // Logical functions
    If,
    And,
    Or,
    Not,
    Xor,
    IfError,
    IfNa,
    True,
    False,

    // Math functions
    Abs,
    Round,
    RoundUp,
    RoundDown,
    Int,
    Mod,
    Power,
    Sqrt,
    Floor,
    Ceiling,
    Sign,
    Pi,

    // Lookup & reference functions
    VLookup,
    HLookup,
    Index,
    Match,
    Rows,
    Columns,

    // Text functions
    Len,
    Upper,
    Lower,
    Trim,
    Concatenate,
    Left,
    Right,
    Mid,
    Rept,
    Find,
    Substitute,
    Value,
    Exact,

    // Date functions
    Date,
    Year,
    Month,
    Day,
    Weekday,
    Days,
    EDate,

    // Information functions
    IsNumber,
    IsText,
    IsBlank,
    IsError,
    IsNa,
    Na,

    /// A name that is not in the registry. Evaluates to #NAME?.
    Unknown(String),
}

/// Broad grouping used by `list_functions` consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionCategory {
    Aggregate,
    Logical,
    Math,
    Lookup,
    Text,
    Date,
    Information,
}

/// Argument-count contract for a function. `max_args` of None means variadic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub category: FunctionCategory,
}

impl Signature {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

const fn sig(
    name: &'static str,
    min_args: usize,
    max_args: Option<usize>,
    category: FunctionCategory,
) -> Signature {
    Signature {
        name,
        min_args,
        max_args,
        category,
    }
}

use FunctionCategory::*;

/// Every registered function with its signature. Aliases share a variant.
pub static CATALOG: &[(BuiltinFunction, Signature)] = &[
    (BuiltinFunction::Sum, sig("SUM", 1, None, Aggregate)),
    (BuiltinFunction::Average, sig("AVERAGE", 1, None, Aggregate)),
    (BuiltinFunction::Min, sig("MIN", 1, None, Aggregate)),
    (BuiltinFunction::Max, sig("MAX", 1, None, Aggregate)),
    (BuiltinFunction::Count, sig("COUNT", 1, None, Aggregate)),
    (BuiltinFunction::CountA, sig("COUNTA", 1, None, Aggregate)),
    (BuiltinFunction::CountBlank, sig("COUNTBLANK", 1, Some(1), Aggregate)),
    (BuiltinFunction::Product, sig("PRODUCT", 1, None, Aggregate)),
    (BuiltinFunction::SumIf, sig("SUMIF", 2, Some(3), Aggregate)),
    (BuiltinFunction::CountIf, sig("COUNTIF", 2, Some(2), Aggregate)),
    (BuiltinFunction::AverageIf, sig("AVERAGEIF", 2, Some(3), Aggregate)),
    (BuiltinFunction::If, sig("IF", 2, Some(3), Logical)),
    (BuiltinFunction::And, sig("AND", 1, None, Logical)),
    (BuiltinFunction::Or, sig("OR", 1, None, Logical)),
    (BuiltinFunction::Not, sig("NOT", 1, Some(1), Logical)),
    (BuiltinFunction::Xor, sig("XOR", 1, None, Logical)),
    (BuiltinFunction::IfError, sig("IFERROR", 2, Some(2), Logical)),
    (BuiltinFunction::IfNa, sig("IFNA", 2, Some(2), Logical)),
    (BuiltinFunction::True, sig("TRUE", 0, Some(0), Logical)),
    (BuiltinFunction::False, sig("FALSE", 0, Some(0), Logical)),
    (BuiltinFunction::Abs, sig("ABS", 1, Some(1), Math)),
    (BuiltinFunction::Round, sig("ROUND", 1, Some(2), Math)),
    (BuiltinFunction::RoundUp, sig("ROUNDUP", 1, Some(2), Math)),
    (BuiltinFunction::RoundDown, sig("ROUNDDOWN", 1, Some(2), Math)),
    (BuiltinFunction::Int, sig("INT", 1, Some(1), Math)),
    (BuiltinFunction::Mod, sig("MOD", 2, Some(2), Math)),
    (BuiltinFunction::Power, sig("POWER", 2, Some(2), Math)),
    (BuiltinFunction::Sqrt, sig("SQRT", 1, Some(1), Math)),
    (BuiltinFunction::Floor, sig("FLOOR", 1, Some(2), Math)),
    (BuiltinFunction::Ceiling, sig("CEILING", 1, Some(2), Math)),
    (BuiltinFunction::Sign, sig("SIGN", 1, Some(1), Math)),
    (BuiltinFunction::Pi, sig("PI", 0, Some(0), Math)),
    (BuiltinFunction::VLookup, sig("VLOOKUP", 3, Some(4), Lookup)),
    (BuiltinFunction::HLookup, sig("HLOOKUP", 3, Some(4), Lookup)),
    (BuiltinFunction::Index, sig("INDEX", 2, Some(3), Lookup)),
    (BuiltinFunction::Match, sig("MATCH", 2, Some(3), Lookup)),
    (BuiltinFunction::Rows, sig("ROWS", 1, Some(1), Lookup)),
    (BuiltinFunction::Columns, sig("COLUMNS", 1, Some(1), Lookup)),
    (BuiltinFunction::Len, sig("LEN", 1, Some(1), Text)),
    (BuiltinFunction::Upper, sig("UPPER", 1, Some(1), Text)),
    (BuiltinFunction::Lower, sig("LOWER", 1, Some(1), Text)),
    (BuiltinFunction::Trim, sig("TRIM", 1, Some(1), Text)),
    (BuiltinFunction::Concatenate, sig("CONCATENATE", 1, None, Text)),
    (BuiltinFunction::Left, sig("LEFT", 1, Some(2), Text)),
    (BuiltinFunction::Right, sig("RIGHT", 1, Some(2), Text)),
    (BuiltinFunction::Mid, sig("MID", 3, Some(3), Text)),
    (BuiltinFunction::Rept, sig("REPT", 2, Some(2), Text)),
    (BuiltinFunction::Find, sig("FIND", 2, Some(3), Text)),
    (BuiltinFunction::Substitute, sig("SUBSTITUTE", 3, Some(4), Text)),
    (BuiltinFunction::Value, sig("VALUE", 1, Some(1), Text)),
    (BuiltinFunction::Exact, sig("EXACT", 2, Some(2), Text)),
    (BuiltinFunction::Date, sig("DATE", 3, Some(3), Date)),
    (BuiltinFunction::Year, sig("YEAR", 1, Some(1), Date)),
    (BuiltinFunction::Month, sig("MONTH", 1, Some(1), Date)),
    (BuiltinFunction::Day, sig("DAY", 1, Some(1), Date)),
    (BuiltinFunction::Weekday, sig("WEEKDAY", 1, Some(2), Date)),
    (BuiltinFunction::Days, sig("DAYS", 2, Some(2), Date)),
    (BuiltinFunction::EDate, sig("EDATE", 2, Some(2), Date)),
    (BuiltinFunction::IsNumber, sig("ISNUMBER", 1, Some(1), Information)),
    (BuiltinFunction::IsText, sig("ISTEXT", 1, Some(1), Information)),
    (BuiltinFunction::IsBlank, sig("ISBLANK", 1, Some(1), Information)),
    (BuiltinFunction::IsError, sig("ISERROR", 1, Some(1), Information)),
    (BuiltinFunction::IsNa, sig("ISNA", 1, Some(1), Information)),
    (BuiltinFunction::Na, sig("NA", 0, Some(0), Information)),
];

/// Alternative spellings accepted by the parser.
const ALIASES: &[(&str, &str)] = &[
    ("AVG", "AVERAGE"),
    ("CONCAT", "CONCATENATE"),
    ("CEIL", "CEILING"),
    ("POW", "POWER"),
];

static BY_NAME: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, usize> = CATALOG
        .iter()
        .enumerate()
        .map(|(i, (_, sig))| (sig.name, i))
        .collect();
    for (alias, target) in ALIASES {
        if let Some(&idx) = map.get(target) {
            map.insert(*alias, idx);
        }
    }
    map
});

impl BuiltinFunction {
    /// Resolves an (already upper-cased) function name.
    /// Names not in the registry become `Unknown`.
    pub fn from_name(name: &str) -> BuiltinFunction {
        let upper = name.to_uppercase();
        match BY_NAME.get(upper.as_str()) {
            Some(&idx) => CATALOG[idx].0.clone(),
            None => BuiltinFunction::Unknown(upper),
        }
    }

    /// The registered signature, or None for unknown functions.
    pub fn signature(&self) -> Option<&'static Signature> {
        if let BuiltinFunction::Unknown(_) = self {
            return None;
        }
        CATALOG
            .iter()
            .find(|(func, _)| func == self)
            .map(|(_, sig)| sig)
    }

    pub fn name(&self) -> &str {
        match self {
            BuiltinFunction::Unknown(name) => name,
            other => other.signature().map(|s| s.name).unwrap_or(""),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BuiltinFunction::Unknown(_))
    }
}

/// All registered signatures, in catalog order.
pub fn list_functions() -> Vec<&'static Signature> {
    CATALOG.iter().map(|(_, sig)| sig).collect()
}
