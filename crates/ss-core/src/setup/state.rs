use serde::{Deserialize, Serialize};

use crate::setup::SetupError;

/// Observable setup flow state. Exactly one node is active at a time.
///
/// Every node except the validation results is supplied by the negotiation
/// backend; the orchestration layer replaces (never merges) the current node
/// when an authoritative state arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SetupState {
    /// Not started yet; the user picks New / Join.
    Welcome,

    /// Create space: passphrase entry.
    CreateSpaceInputPassphrase { error: Option<SetupError> },

    /// Join space: device picker.
    JoinSpaceSelectDevice { error: Option<SetupError> },

    /// Join space: confirm the peer identity (short code / fingerprint).
    JoinSpaceConfirmPeer {
        short_code: String,
        peer_fingerprint: Option<String>,
        error: Option<SetupError>,
    },

    /// Join space: passphrase entry to unlock the space.
    JoinSpaceInputPassphrase { error: Option<SetupError> },

    ProcessingCreateSpace { message: Option<String> },

    ProcessingJoinSpace { message: Option<String> },

    /// Setup finished.
    Completed,
}

impl SetupState {
    /// Stable variant name, used as the fence dedupe discriminant.
    pub fn discriminant(&self) -> &'static str {
        match self {
            SetupState::Welcome => "welcome",
            SetupState::CreateSpaceInputPassphrase { .. } => "create-space-input-passphrase",
            SetupState::JoinSpaceSelectDevice { .. } => "join-space-select-device",
            SetupState::JoinSpaceConfirmPeer { .. } => "join-space-confirm-peer",
            SetupState::JoinSpaceInputPassphrase { .. } => "join-space-input-passphrase",
            SetupState::ProcessingCreateSpace { .. } => "processing-create-space",
            SetupState::ProcessingJoinSpace { .. } => "processing-join-space",
            SetupState::Completed => "completed",
        }
    }

    /// True while a backend operation is in flight.
    pub fn is_processing(&self) -> bool {
        matches!(
            self,
            SetupState::ProcessingCreateSpace { .. } | SetupState::ProcessingJoinSpace { .. }
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SetupState::Completed)
    }
}
