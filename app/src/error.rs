//! FILENAME: app/src/error.rs
//! PURPOSE: The error type every service operation returns.
//! CONTEXT: Serialized as its display message, so callers receive the same
//! readable string the commands log.

use collab::CollabError;
use engine::EngineError;
use pivot_engine::PivotError;
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("Spreadsheet {0} not found")]
    SpreadsheetNotFound(Uuid),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Pivot(#[from] PivotError),

    #[error(transparent)]
    Collab(#[from] CollabError),

    #[error("Range of {requested} cells exceeds the limit of {limit}")]
    RangeTooLarge { requested: u64, limit: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Serialize for ServiceError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
