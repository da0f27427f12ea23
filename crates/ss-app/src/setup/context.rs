use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use ss_core::{ids::SessionId, setup::SetupSession, SetupState};

/// Shared setup session state plus the dispatch lock that serializes
/// concurrent command/notification application.
///
/// ## Lock ordering
/// `dispatch_lock` is acquired first, then `session`. `dispatch_lock` is
/// only taken for dispatch operations, never for reads, so `get_state`
/// stays cheap while a backend call is in flight.
pub struct SetupContext {
    session: Mutex<SetupSession>,
    /// Serializes dispatch calls so a transition, its backend calls, and the
    /// resulting state update run as one unit against concurrent callers.
    dispatch_lock: Mutex<()>,
}

impl SetupContext {
    pub fn new(initial_state: SetupState) -> Self {
        Self {
            session: Mutex::new(SetupSession {
                state: initial_state,
                ..SetupSession::default()
            }),
            dispatch_lock: Mutex::new(()),
        }
    }

    /// Context wrapped for shared ownership.
    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub async fn get_state(&self) -> SetupState {
        self.session.lock().await.state.clone()
    }

    /// Full attempt snapshot for the presentation layer.
    pub async fn snapshot(&self) -> SetupSession {
        self.session.lock().await.clone()
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        self.session.lock().await.session_id.clone()
    }

    pub async fn set_state(&self, state: SetupState) {
        self.session.lock().await.state = state;
    }

    /// Record an admitted backend event on the session.
    pub async fn record_event(&self, session_id: Option<SessionId>, ts: DateTime<Utc>) {
        self.session.lock().await.touch(session_id, ts);
    }

    /// Clear attempt-scoped data (session id, timestamps), keeping the
    /// visible state untouched.
    pub async fn reset_attempt(&self) {
        self.session.lock().await.reset_attempt();
    }

    pub async fn acquire_dispatch_lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.dispatch_lock.lock().await
    }
}

impl Default for SetupContext {
    fn default() -> Self {
        Self::new(SetupState::Welcome)
    }
}
