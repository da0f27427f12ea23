use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PeerId, SessionId};

/// Stage of a PIN-verification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PairingPhase {
    /// Inbound request awaiting an accept/reject decision (responder view).
    Requested,
    /// Both sides display the identical short code.
    VerificationCodeReady,
    /// A judgment was submitted; awaiting the counterpart.
    Verifying,
    Complete,
    Failed,
}

/// One in-flight pairing attempt.
///
/// Created on request initiation or receipt; destroyed on completion,
/// failure, or cancellation. Owned exclusively by the pairing controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingAttempt {
    pub session_id: SessionId,
    pub peer_id: PeerId,
    pub device_name: Option<String>,
    pub phase: PairingPhase,
    /// Short code to compare out-of-band. Present from
    /// `VerificationCodeReady` onwards.
    pub code: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PairingAttempt {
    pub fn new(session_id: SessionId, peer_id: PeerId, device_name: Option<String>) -> Self {
        Self {
            session_id,
            peer_id,
            device_name,
            phase: PairingPhase::Requested,
            code: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.phase, PairingPhase::Complete | PairingPhase::Failed)
    }
}
