use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    ids::{PeerId, SessionId},
    ports::TransportError,
};

/// Backend acknowledgment of a pairing initiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingTicket {
    pub session_id: Option<SessionId>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request/response surface of the negotiation backend for pairing.
#[async_trait]
pub trait PairingTransportPort: Send + Sync {
    async fn initiate_pairing(&self, peer_id: &PeerId) -> Result<PairingTicket, TransportError>;

    async fn accept_pairing(&self, session_id: &SessionId) -> Result<(), TransportError>;

    async fn reject_pairing(
        &self,
        session_id: &SessionId,
        peer_id: &PeerId,
    ) -> Result<(), TransportError>;

    /// Report the user's short-code judgment. `pin_matches == false` tears
    /// the attempt down on the backend as well.
    async fn verify_pairing_pin(
        &self,
        session_id: &SessionId,
        pin_matches: bool,
    ) -> Result<(), TransportError>;
}
