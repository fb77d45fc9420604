//! FILENAME: core/collab/src/participant.rs

use chrono::{DateTime, Duration, Utc};
use engine::{CellKey, CellRange};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ParticipantId = Uuid;

/// Where a participant is looking. Both parts are optional; an update
/// replaces the whole presence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    #[serde(default)]
    pub cursor: Option<CellKey>,
    #[serde(default)]
    pub selection: Option<CellRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub user: String,
    pub presence: Presence,
    pub joined_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

impl Participant {
    pub fn new(user: impl Into<String>, now: DateTime<Utc>) -> Self {
        Participant {
            id: Uuid::new_v4(),
            user: user.into(),
            presence: Presence::default(),
            joined_at: now,
            last_heartbeat: now,
        }
    }

    /// True once more than `timeout` has passed since the last heartbeat.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_heartbeat > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_after_the_timeout() {
        let start = DateTime::<Utc>::UNIX_EPOCH;
        let p = Participant::new("ana", start);
        let timeout = Duration::seconds(30);
        assert!(!p.is_expired(start + Duration::seconds(30), timeout));
        assert!(p.is_expired(start + Duration::seconds(31), timeout));
    }

    #[test]
    fn ids_are_random_v4() {
        let now = Utc::now();
        let a = Participant::new("a", now);
        let b = Participant::new("a", now);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.get_version_num(), 4);
    }
}
