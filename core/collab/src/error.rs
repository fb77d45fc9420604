//! FILENAME: core/collab/src/error.rs

use crate::participant::ParticipantId;
use crate::session::SpreadsheetId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    #[error("Participant {0} is not in the session")]
    UnknownParticipant(ParticipantId),

    #[error("No collaboration session for spreadsheet {0}")]
    UnknownSession(SpreadsheetId),
}

pub type CollabResult<T> = Result<T, CollabError>;
