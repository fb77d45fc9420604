//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the formula parser.
//! CONTEXT: This module exposes the lexer, parser, AST and function registry
//! needed to convert formula strings into evaluatable expression trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /, ^ (power, right-associative), % (postfix)
//! - Comparison: =, <>, <, >, <=, >=
//! - String concatenation: &
//! - Cell references: A1, $A$1, Sheet2!A1, 'My Sheet'!A1
//! - Ranges: A1:B10, A:A, 1:3
//! - Names: workbook variables such as TAXRATE
//! - Function calls resolved against a static registry: SUM(A1:A10)
//! - Error literals: #DIV/0!, #N/A, ...

pub mod ast;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod validate;


// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator, Value, ERROR_CODES};
pub use functions::{list_functions, BuiltinFunction, FunctionCategory, Signature};
pub use lexer::Lexer;
pub use parser::{is_formula, parse, ParseError, ParseResult, Parser, FORMULA_MARKER, MAX_NESTING};
pub use token::{SpannedToken, Token};
pub use validate::{validate, FormulaCheck};
