//! FILENAME: core/collab/src/events.rs
//! Events fanned out to every subscriber of a session.

use crate::participant::{Participant, ParticipantId, Presence};
use crate::session::SessionId;
use engine::CellKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReason {
    Left,
    TimedOut,
    SessionClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollabEvent {
    ParticipantJoined {
        session: SessionId,
        participant: Participant,
    },
    ParticipantLeft {
        session: SessionId,
        participant: ParticipantId,
        user: String,
        reason: LeaveReason,
    },
    PresenceUpdated {
        session: SessionId,
        participant: ParticipantId,
        presence: Presence,
    },
    /// A committed edit batch: edited plus recalculated cells.
    CellsUpdated {
        session: SessionId,
        revision: u64,
        editor: Option<String>,
        cells: Vec<CellKey>,
    },
    /// Last-write-wins replaced another participant's value.
    EditOverwritten {
        session: SessionId,
        cell: CellKey,
        previous_editor: String,
        by: String,
    },
}

impl CollabEvent {
    pub fn session(&self) -> SessionId {
        match self {
            CollabEvent::ParticipantJoined { session, .. }
            | CollabEvent::ParticipantLeft { session, .. }
            | CollabEvent::PresenceUpdated { session, .. }
            | CollabEvent::CellsUpdated { session, .. }
            | CollabEvent::EditOverwritten { session, .. } => *session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = CollabEvent::CellsUpdated {
            session: Uuid::nil(),
            revision: 3,
            editor: Some("ana".to_string()),
            cells: vec![CellKey::new(0, 1, 2)],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "cells_updated");
        assert_eq!(json["revision"], 3);
        assert_eq!(json["cells"][0]["col"], 2);

        let left = CollabEvent::ParticipantLeft {
            session: Uuid::nil(),
            participant: Uuid::nil(),
            user: "bo".to_string(),
            reason: LeaveReason::TimedOut,
        };
        assert_eq!(serde_json::to_value(&left).unwrap()["reason"], "timed_out");
        assert_eq!(left.session(), Uuid::nil());
    }
}
