//! FILENAME: core/collab/src/lib.rs
//! Collaboration subsystem.
//!
//! Tracks who is editing each spreadsheet and fans out presence and
//! cell-change events. All state is in memory; nothing here touches cells.
//!
//! Layers:
//! - `clock`: injectable time source (heartbeat expiry is measured with it)
//! - `participant`: participants and their presence
//! - `events`: the broadcast event type
//! - `session`: one spreadsheet's session
//! - `manager`: sessions keyed by spreadsheet

pub mod clock;
pub mod error;
pub mod events;
pub mod manager;
pub mod participant;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CollabError, CollabResult};
pub use events::{CollabEvent, LeaveReason};
pub use manager::{SessionConfig, SessionManager};
pub use participant::{Participant, ParticipantId, Presence};
pub use session::{CollaborationSession, SessionId, SessionState, SpreadsheetId};
