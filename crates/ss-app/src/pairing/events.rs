use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use ss_core::{ids::SessionId, pairing::PairingAttempt};

/// Pairing progress events consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PairingUiEvent {
    /// An inbound request awaits an accept/reject decision.
    RequestReceived { attempt: PairingAttempt },
    /// Both sides can now compare the short code.
    VerificationReady { attempt: PairingAttempt },
    /// A judgment was submitted; waiting for the counterpart.
    AwaitingPeer { session_id: SessionId },
    /// The attempt finished successfully.
    Succeeded { session_id: SessionId },
    /// The attempt failed or was rejected.
    Failed {
        session_id: SessionId,
        error: String,
    },
    /// The decision window elapsed with no user action.
    RequestExpired { session_id: SessionId },
}

#[async_trait]
pub trait PairingEventPort: Send + Sync {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PairingUiEvent>>;
}
