//! FILENAME: app/src/commands/sessions.rs
//! PURPOSE: Collaboration commands: sessions, participants and presence.
//! CONTEXT: These only take the session mutex. They never block on a
//! spreadsheet lock, so presence traffic is not slowed down by edits.

use crate::api_types::{CollaboratorInfo, PresenceRequest, SessionInfo};
use crate::error::{ServiceError, ServiceResult};
use crate::{AppState, SpreadsheetId};
use collab::{CollabEvent, ParticipantId, Presence};
use tokio::sync::broadcast;

/// Starts (or returns) the spreadsheet's collaboration session.
pub fn start_collaboration(state: &AppState, id: SpreadsheetId) -> ServiceResult<SessionInfo> {
    if !state.contains(id) {
        return Err(ServiceError::SpreadsheetNotFound(id));
    }
    let session_id = state.sessions().start(id);
    Ok(SessionInfo {
        session_id,
        spreadsheet_id: id,
    })
}

pub fn join_session(state: &AppState, id: SpreadsheetId, user: &str) -> ServiceResult<ParticipantId> {
    if user.trim().is_empty() {
        return Err(ServiceError::InvalidInput("user name is empty".to_string()));
    }
    Ok(state.sessions().join(id, user)?)
}

pub fn leave_session(
    state: &AppState,
    id: SpreadsheetId,
    participant: ParticipantId,
) -> ServiceResult<()> {
    state.sessions().leave(id, participant)?;
    Ok(())
}

pub fn heartbeat(state: &AppState, id: SpreadsheetId, participant: ParticipantId) -> ServiceResult<()> {
    Ok(state.sessions().heartbeat(id, participant)?)
}

/// Last write wins per participant.
pub fn update_presence(
    state: &AppState,
    id: SpreadsheetId,
    request: PresenceRequest,
) -> ServiceResult<()> {
    let presence = Presence {
        cursor: request.cursor,
        selection: request.selection,
    };
    Ok(state
        .sessions()
        .update_presence(id, request.participant, presence)?)
}

/// Active participants in join order; timed-out ones are left out.
pub fn get_collaborators(state: &AppState, id: SpreadsheetId) -> ServiceResult<Vec<CollaboratorInfo>> {
    let participants = state.sessions().list_participants(id)?;
    Ok(participants.into_iter().map(CollaboratorInfo::from).collect())
}

pub fn subscribe(
    state: &AppState,
    id: SpreadsheetId,
) -> ServiceResult<broadcast::Receiver<CollabEvent>> {
    Ok(state.sessions().subscribe(id)?)
}

/// Removes timed-out participants from every session. Meant to be called
/// periodically; returns how many were removed.
pub fn sweep_sessions(state: &AppState) -> usize {
    state.sessions().sweep_expired()
}
