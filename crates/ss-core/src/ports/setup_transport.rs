use async_trait::async_trait;

use crate::{
    ids::PeerId, ports::TransportError, security::SecretString, setup::SetupState,
};

/// Request/response surface of the negotiation backend for the setup flow.
///
/// Every call returns the authoritative next state; domain errors arrive
/// attached to that state, only transport failures are `Err`.
#[async_trait]
pub trait SetupTransportPort: Send + Sync {
    async fn get_setup_state(&self) -> Result<SetupState, TransportError>;

    async fn start_new_space(&self) -> Result<SetupState, TransportError>;

    async fn start_join_space(&self) -> Result<SetupState, TransportError>;

    async fn select_device(&self, peer_id: &PeerId) -> Result<SetupState, TransportError>;

    async fn submit_passphrase(
        &self,
        passphrase: SecretString,
        confirm: SecretString,
    ) -> Result<SetupState, TransportError>;

    async fn verify_passphrase(
        &self,
        passphrase: SecretString,
    ) -> Result<SetupState, TransportError>;

    async fn confirm_peer_trust(&self) -> Result<SetupState, TransportError>;

    /// Abandon the current attempt. Safe to call with nothing in flight.
    async fn cancel_setup(&self) -> Result<(), TransportError>;
}
