//! Pairing commands.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use ss_core::ports::PairingTicket;

use crate::facade::CommandError;
use crate::pairing::PairingController;

/// Presentation-facing pairing command surface.
#[derive(Clone)]
pub struct PairingFacade {
    controller: Arc<PairingController>,
}

impl PairingFacade {
    pub fn new(controller: Arc<PairingController>) -> Self {
        Self { controller }
    }

    /// Start pairing with a peer. Never raises: transport failures come back
    /// as an unsuccessful ticket.
    pub async fn initiate_pairing(&self, peer_id: String) -> PairingTicket {
        let span = info_span!("command.pairing.initiate", peer_id = %peer_id);
        async {
            match self.controller.initiate(&peer_id.into()).await {
                Ok(ticket) => ticket,
                Err(err) => PairingTicket {
                    session_id: None,
                    success: false,
                    error: Some(CommandError::from(err).to_string()),
                },
            }
        }
        .instrument(span)
        .await
    }

    pub async fn accept_pairing(&self, session_id: String) -> Result<(), CommandError> {
        let span = info_span!("command.pairing.accept", session_id = %session_id);
        async { Ok(self.controller.accept(&session_id.into()).await?) }
            .instrument(span)
            .await
    }

    pub async fn reject_pairing(
        &self,
        session_id: String,
        peer_id: String,
    ) -> Result<(), CommandError> {
        let span = info_span!("command.pairing.reject", session_id = %session_id);
        async {
            Ok(self
                .controller
                .reject(&session_id.into(), &peer_id.into())
                .await?)
        }
        .instrument(span)
        .await
    }

    pub async fn verify_pairing_pin(
        &self,
        session_id: String,
        pin_matches: bool,
    ) -> Result<(), CommandError> {
        let span = info_span!(
            "command.pairing.verify_pin",
            session_id = %session_id,
            pin_matches
        );
        async {
            Ok(self
                .controller
                .confirm_pin(&session_id.into(), pin_matches)
                .await?)
        }
        .instrument(span)
        .await
    }
}
