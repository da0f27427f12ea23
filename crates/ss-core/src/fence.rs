//! Session fence.
//!
//! Decides whether an inbound backend notification may affect visible state.
//! Backends redeliver notifications at-least-once and a user may abandon one
//! attempt and start another before in-flight events drain; the fence yields
//! exactly-once, single-session semantics without requiring an ordered or
//! deduplicated backend. Admission is decided purely from session id and
//! dedupe key, never from arrival order.

use std::collections::VecDeque;

use crate::{events::Notification, ids::SessionId};

/// Upper bound on remembered dedupe keys per attempt.
pub const DEFAULT_SEEN_CAPACITY: usize = 64;

/// Dedupe key for one notification: which attempt it belongs to, which state
/// or kind it announces, and a payload marker (timestamp, code, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeenEventKey {
    pub session_id: SessionId,
    pub discriminant: String,
    pub marker: String,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceDecision {
    /// Belongs to the active attempt and has not been seen before.
    Admit,
    /// Session id does not match the active attempt — cross-talk or a
    /// straggler from a finished attempt. Dropped silently, not an error.
    DropForeign,
    /// Dedupe key already recorded for this attempt.
    DropDuplicate,
}

/// Tracks the active attempt's session id and filters/deduplicates inbound
/// notifications. One fence instance is shared by the setup and pairing
/// controllers.
#[derive(Debug)]
pub struct SessionFence {
    active: Option<SessionId>,
    /// Most recently released session id. Stragglers for it keep getting
    /// dropped after the attempt ends.
    released: Option<SessionId>,
    seen: VecDeque<SeenEventKey>,
    capacity: usize,
}

impl SessionFence {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SEEN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            active: None,
            released: None,
            seen: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn active_session(&self) -> Option<&SessionId> {
        self.active.as_ref()
    }

    /// Explicitly adopt a session id obtained from a command response.
    ///
    /// Adopting a different session than the current one starts a fresh
    /// attempt: the seen set is cleared along with the switch.
    pub fn adopt(&mut self, session_id: SessionId) {
        if self.active.as_ref() == Some(&session_id) {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(session_id = %session_id, "fence adopting session");
        self.active = Some(session_id);
        self.seen.clear();
    }

    /// Decide whether `notification` may be applied.
    pub fn admit(&mut self, notification: &Notification) -> FenceDecision {
        let Some(session_id) = notification.session_id() else {
            // Nothing to fence against; let it through.
            return FenceDecision::Admit;
        };

        if let Some(active) = &self.active {
            if active != session_id {
                return FenceDecision::DropForeign;
            }
        } else {
            if self.released.as_ref() == Some(session_id) {
                return FenceDecision::DropForeign;
            }
            if !notification.opens_session() {
                return FenceDecision::DropForeign;
            }
            self.adopt(session_id.clone());
        }

        match notification.dedupe_key() {
            Some(key) => self.record(key),
            None => FenceDecision::Admit,
        }
    }

    /// End the active attempt: clear the session id and the seen set,
    /// remembering the released id so late duplicates stay fenced out.
    pub fn release(&mut self) {
        if let Some(active) = self.active.take() {
            #[cfg(feature = "tracing")]
            tracing::debug!(session_id = %active, "fence releasing session");
            self.released = Some(active);
        }
        self.seen.clear();
    }

    fn record(&mut self, key: SeenEventKey) -> FenceDecision {
        if self.seen.contains(&key) {
            return FenceDecision::DropDuplicate;
        }
        if self.seen.len() == self.capacity {
            self.seen.pop_front();
        }
        self.seen.push_back(key);
        FenceDecision::Admit
    }
}

impl Default for SessionFence {
    fn default() -> Self {
        Self::new()
    }
}
