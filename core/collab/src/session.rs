//! FILENAME: core/collab/src/session.rs
//! PURPOSE: One spreadsheet's collaboration session.
//! CONTEXT: A session is *empty* until someone joins and returns to *empty*
//! when the last participant leaves or times out. Events are published on a
//! `tokio::sync::broadcast` channel: sending never blocks, and a receiver that
//! falls behind by more than the channel capacity loses the oldest events.

use crate::clock::Clock;
use crate::error::{CollabError, CollabResult};
use crate::events::{CollabEvent, LeaveReason};
use crate::participant::{Participant, ParticipantId, Presence};
use chrono::Duration;
use engine::{CellKey, Overwrite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type SessionId = Uuid;
pub type SpreadsheetId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Empty,
    Active,
}

#[derive(Debug)]
pub struct CollaborationSession {
    id: SessionId,
    spreadsheet: SpreadsheetId,
    /// Join order.
    participants: Vec<Participant>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    events: broadcast::Sender<CollabEvent>,
}

impl CollaborationSession {
    /// `capacity` is the per-receiver event backlog and must be non-zero.
    pub fn new(
        spreadsheet: SpreadsheetId,
        clock: Arc<dyn Clock>,
        timeout: Duration,
        capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        CollaborationSession {
            id: Uuid::new_v4(),
            spreadsheet,
            participants: Vec::new(),
            clock,
            timeout,
            events,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn spreadsheet(&self) -> SpreadsheetId {
        self.spreadsheet
    }

    pub fn state(&self) -> SessionState {
        if self.list_participants().is_empty() {
            SessionState::Empty
        } else {
            SessionState::Active
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollabEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // PARTICIPANTS
    // ========================================================================

    pub fn join(&mut self, user: &str) -> ParticipantId {
        let participant = Participant::new(user, self.clock.now());
        let id = participant.id;
        engine::log_info!("COLLAB", "{} joined session {} as {}", user, self.id, id);

        self.participants.push(participant.clone());
        self.publish(CollabEvent::ParticipantJoined {
            session: self.id,
            participant,
        });
        id
    }

    /// Replaces the participant's presence and counts as a heartbeat.
    pub fn update_presence(
        &mut self,
        participant: ParticipantId,
        presence: Presence,
    ) -> CollabResult<()> {
        let now = self.clock.now();
        let entry = self.live_participant_mut(participant)?;
        entry.presence = presence.clone();
        entry.last_heartbeat = now;

        self.publish(CollabEvent::PresenceUpdated {
            session: self.id,
            participant,
            presence,
        });
        Ok(())
    }

    pub fn heartbeat(&mut self, participant: ParticipantId) -> CollabResult<()> {
        let now = self.clock.now();
        self.live_participant_mut(participant)?.last_heartbeat = now;
        Ok(())
    }

    pub fn leave(&mut self, participant: ParticipantId) -> CollabResult<Participant> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id == participant)
            .ok_or(CollabError::UnknownParticipant(participant))?;
        Ok(self.remove_at(index, LeaveReason::Left))
    }

    /// Active participants in join order. Timed-out participants are hidden
    /// even before `sweep_expired` removes them.
    pub fn list_participants(&self) -> Vec<Participant> {
        let now = self.clock.now();
        self.participants
            .iter()
            .filter(|p| !p.is_expired(now, self.timeout))
            .cloned()
            .collect()
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Removes every participant whose heartbeat is older than the timeout.
    pub fn sweep_expired(&mut self) -> Vec<ParticipantId> {
        let now = self.clock.now();
        let mut expired = Vec::new();
        let mut index = 0;
        while index < self.participants.len() {
            if self.participants[index].is_expired(now, self.timeout) {
                expired.push(self.remove_at(index, LeaveReason::TimedOut).id);
            } else {
                index += 1;
            }
        }
        expired
    }

    /// Removes everyone. Used when the spreadsheet is closed.
    pub fn close(&mut self) {
        while !self.participants.is_empty() {
            self.remove_at(0, LeaveReason::SessionClosed);
        }
    }

    fn live_participant_mut(&mut self, id: ParticipantId) -> CollabResult<&mut Participant> {
        let now = self.clock.now();
        let timeout = self.timeout;
        self.participants
            .iter_mut()
            .find(|p| p.id == id && !p.is_expired(now, timeout))
            .ok_or(CollabError::UnknownParticipant(id))
    }

    fn remove_at(&mut self, index: usize, reason: LeaveReason) -> Participant {
        let participant = self.participants.remove(index);
        engine::log_info!(
            "COLLAB",
            "{} ({}) left session {}: {:?}",
            participant.user,
            participant.id,
            self.id,
            reason
        );
        self.publish(CollabEvent::ParticipantLeft {
            session: self.id,
            participant: participant.id,
            user: participant.user.clone(),
            reason,
        });
        participant
    }

    // ========================================================================
    // CELL EVENTS
    // ========================================================================

    pub fn publish_cells_updated(&self, revision: u64, editor: Option<&str>, cells: Vec<CellKey>) {
        self.publish(CollabEvent::CellsUpdated {
            session: self.id,
            revision,
            editor: editor.map(str::to_string),
            cells,
        });
    }

    pub fn publish_overwrites(&self, overwrites: &[Overwrite]) {
        for o in overwrites {
            engine::log_info!(
                "COLLAB",
                "{} overwrote {} last written by {}",
                o.by,
                o.cell,
                o.previous_editor
            );
            self.publish(CollabEvent::EditOverwritten {
                session: self.id,
                cell: o.cell,
                previous_editor: o.previous_editor.clone(),
                by: o.by.clone(),
            });
        }
    }

    /// Fire-and-forget. Having no receivers is not an error.
    fn publish(&self, event: CollabEvent) {
        let _ = self.events.send(event);
    }
}
