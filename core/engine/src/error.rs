//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Errors returned by workbook operations.
//! CONTEXT: These are request-level failures (nothing was changed). Errors
//! that live inside cells are `CellError` values, not Rust errors.

use parser::ParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Sheet index {index} is out of range (workbook has {count} sheets)")]
    SheetOutOfRange { index: u32, count: usize },

    #[error("A sheet named '{0}' already exists")]
    DuplicateSheet(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("'{0}' is not a valid variable name")]
    InvalidName(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
