use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{ids::SessionId, setup::SetupState};

/// Snapshot of one setup attempt.
///
/// Created when a create/join flow is initiated and reset on cancel or
/// completion. The presentation layer only ever sees clones of this.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupSession {
    pub session_id: Option<SessionId>,
    pub state: SetupState,
    pub last_event_timestamp: Option<DateTime<Utc>>,
}

impl SetupSession {
    /// Record an admitted backend event.
    pub fn touch(&mut self, session_id: Option<SessionId>, ts: DateTime<Utc>) {
        if let Some(id) = session_id {
            self.session_id = Some(id);
        }
        self.last_event_timestamp = Some(ts);
    }

    /// Drop all attempt-scoped data, keeping only the visible state.
    pub fn reset_attempt(&mut self) {
        self.session_id = None;
        self.last_event_timestamp = None;
    }
}

impl Default for SetupSession {
    fn default() -> Self {
        Self {
            session_id: None,
            state: SetupState::Welcome,
            last_event_timestamp: None,
        }
    }
}
