//! FILENAME: core/pivot-engine/src/error.rs
//! Errors for pivot configuration and lifecycle.

use crate::definition::{FieldIndex, FieldRef, PivotId};
use engine::{CellRange, EngineError};
use thiserror::Error;

/// A pivot configuration that cannot be applied to its source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Field '{0}' does not exist in the source headers")]
    UnknownField(String),

    #[error("Field index {index} is outside the source range ({width} columns)")]
    FieldOutOfRange { index: FieldIndex, width: u64 },

    #[error("A pivot needs at least one group-by or measure field")]
    NoFields,

    #[error("Destination output {output} overlaps the source range {source_range}")]
    DestinationOverlapsSource {
        output: CellRange,
        source_range: CellRange,
    },

    #[error("Destination output does not fit on the sheet")]
    DestinationOutOfBounds,
}

impl ValidationError {
    pub(crate) fn unknown(field: &FieldRef) -> Self {
        ValidationError::UnknownField(field.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PivotError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Pivot {0} not found")]
    NotFound(PivotId),

    #[error("{0}")]
    Engine(#[from] EngineError),
}

pub type PivotResult<T> = Result<T, PivotError>;
