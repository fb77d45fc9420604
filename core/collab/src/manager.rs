//! FILENAME: core/collab/src/manager.rs
//! Sessions keyed by spreadsheet.
//!
//! `start` is idempotent: a spreadsheet has at most one session, and an
//! empty session stays registered until `close` is called.

use crate::clock::{Clock, SystemClock};
use crate::error::{CollabError, CollabResult};
use crate::events::CollabEvent;
use crate::participant::{Participant, ParticipantId, Presence};
use crate::session::{CollaborationSession, SessionId, SpreadsheetId};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_timeout: Duration,
    pub channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            heartbeat_timeout: Duration::seconds(30),
            channel_capacity: 256,
        }
    }
}

#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<SpreadsheetId, CollaborationSession>,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl Default for SessionManager {
    fn default() -> Self {
        SessionManager::new(SessionConfig::default(), Arc::new(SystemClock))
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        SessionManager {
            sessions: HashMap::new(),
            config,
            clock,
        }
    }

    /// Returns the spreadsheet's session id, creating the session if needed.
    pub fn start(&mut self, spreadsheet: SpreadsheetId) -> SessionId {
        let config = self.config;
        let clock = &self.clock;
        self.sessions
            .entry(spreadsheet)
            .or_insert_with(|| {
                let session = CollaborationSession::new(
                    spreadsheet,
                    clock.clone(),
                    config.heartbeat_timeout,
                    config.channel_capacity,
                );
                engine::log_info!(
                    "COLLAB",
                    "started session {} for spreadsheet {}",
                    session.id(),
                    spreadsheet
                );
                session
            })
            .id()
    }

    /// Drops the spreadsheet's session after removing every participant.
    pub fn close(&mut self, spreadsheet: SpreadsheetId) -> bool {
        match self.sessions.remove(&spreadsheet) {
            Some(mut session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn session(&self, spreadsheet: SpreadsheetId) -> Option<&CollaborationSession> {
        self.sessions.get(&spreadsheet)
    }

    fn session_mut(&mut self, spreadsheet: SpreadsheetId) -> CollabResult<&mut CollaborationSession> {
        self.sessions
            .get_mut(&spreadsheet)
            .ok_or(CollabError::UnknownSession(spreadsheet))
    }

    /// Joining first sweeps the session, so anyone who timed out is
    /// announced as gone before the newcomer arrives.
    pub fn join(&mut self, spreadsheet: SpreadsheetId, user: &str) -> CollabResult<ParticipantId> {
        let session = self.session_mut(spreadsheet)?;
        session.sweep_expired();
        Ok(session.join(user))
    }

    pub fn leave(
        &mut self,
        spreadsheet: SpreadsheetId,
        participant: ParticipantId,
    ) -> CollabResult<Participant> {
        self.session_mut(spreadsheet)?.leave(participant)
    }

    pub fn heartbeat(
        &mut self,
        spreadsheet: SpreadsheetId,
        participant: ParticipantId,
    ) -> CollabResult<()> {
        self.session_mut(spreadsheet)?.heartbeat(participant)
    }

    pub fn update_presence(
        &mut self,
        spreadsheet: SpreadsheetId,
        participant: ParticipantId,
        presence: Presence,
    ) -> CollabResult<()> {
        self.session_mut(spreadsheet)?
            .update_presence(participant, presence)
    }

    /// Sweeps the session, then lists who is left.
    pub fn list_participants(&mut self, spreadsheet: SpreadsheetId) -> CollabResult<Vec<Participant>> {
        let session = self.session_mut(spreadsheet)?;
        session.sweep_expired();
        Ok(session.list_participants())
    }

    pub fn subscribe(
        &self,
        spreadsheet: SpreadsheetId,
    ) -> CollabResult<broadcast::Receiver<CollabEvent>> {
        self.sessions
            .get(&spreadsheet)
            .map(|s| s.subscribe())
            .ok_or(CollabError::UnknownSession(spreadsheet))
    }

    /// Sweeps every session; returns the number of participants removed.
    pub fn sweep_expired(&mut self) -> usize {
        self.sessions
            .values_mut()
            .map(|s| s.sweep_expired().len())
            .sum()
    }
}
