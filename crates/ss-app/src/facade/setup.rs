//! Setup commands.

use std::sync::Arc;

use tracing::{info_span, Instrument};

use ss_core::{security::SecretString, setup::SetupSession, SetupState};

use crate::facade::CommandError;
use crate::setup::SetupController;

/// Presentation-facing setup command surface.
#[derive(Clone)]
pub struct SetupFacade {
    controller: Arc<SetupController>,
}

impl SetupFacade {
    pub fn new(controller: Arc<SetupController>) -> Self {
        Self { controller }
    }

    /// Current setup state, reconstructed from the backend on first call.
    pub async fn get_setup_state(&self) -> SetupState {
        let span = info_span!("command.setup.get_setup_state");
        async { self.controller.get_state().await }
            .instrument(span)
            .await
    }

    /// Read-only attempt snapshot (session id, last event time).
    pub async fn get_setup_session(&self) -> SetupSession {
        self.controller.session_snapshot().await
    }

    pub async fn start_new_space(&self) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.start_new_space");
        async { Ok(self.controller.new_space().await?) }
            .instrument(span)
            .await
    }

    pub async fn start_join_space(&self) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.start_join_space");
        async { Ok(self.controller.join_space().await?) }
            .instrument(span)
            .await
    }

    pub async fn select_device(&self, peer_id: String) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.select_device", peer_id = %peer_id);
        async {
            Ok(self.controller.select_device(peer_id.into()).await?)
        }
        .instrument(span)
        .await
    }

    pub async fn submit_passphrase(
        &self,
        passphrase1: String,
        passphrase2: String,
    ) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.submit_passphrase");
        async {
            Ok(self
                .controller
                .submit_passphrase(SecretString::new(passphrase1), SecretString::new(passphrase2))
                .await?)
        }
        .instrument(span)
        .await
    }

    pub async fn verify_passphrase(&self, passphrase: String) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.verify_passphrase");
        async {
            Ok(self
                .controller
                .verify_passphrase(SecretString::new(passphrase))
                .await?)
        }
        .instrument(span)
        .await
    }

    pub async fn confirm_peer_trust(&self) -> Result<SetupState, CommandError> {
        let span = info_span!("command.setup.confirm_peer_trust");
        async { Ok(self.controller.confirm_peer_trust().await?) }
            .instrument(span)
            .await
    }

    /// Always returns `Welcome` and clears attempt-scoped data; calling it
    /// twice is safe.
    pub async fn cancel_setup(&self) -> SetupState {
        let span = info_span!("command.setup.cancel_setup");
        async { self.controller.cancel_setup().await }
            .instrument(span)
            .await
    }
}
