//! Setup controller.
//!
//! Drives the setup state machine and its backend side effects. Two inputs
//! feed it: user commands (via the facade) and fence-admitted backend pushes
//! (via the runtime router). Both go through the same dispatch lock, so a
//! command's direct response and its corroborating push can interleave in
//! any order without double application.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};

use ss_core::{
    events::SetupStateChanged,
    fence::SessionFence,
    ids::PeerId,
    ports::{SetupEventPort, SetupTransportPort, TransportError},
    security::SecretString,
    setup::{SetupAction, SetupEvent, SetupSession, SetupStateMachine},
    SetupState,
};

use crate::setup::context::SetupContext;

/// Orchestrator for the setup flow.
pub struct SetupController {
    context: Arc<SetupContext>,
    fence: Arc<Mutex<SessionFence>>,
    transport: Arc<dyn SetupTransportPort>,
    events: Arc<dyn SetupEventPort>,
    seeded: AtomicBool,
}

impl SetupController {
    pub fn new(
        fence: Arc<Mutex<SessionFence>>,
        transport: Arc<dyn SetupTransportPort>,
        events: Arc<dyn SetupEventPort>,
    ) -> Self {
        Self {
            context: SetupContext::default().arc(),
            fence,
            transport,
            events,
            seeded: AtomicBool::new(false),
        }
    }

    /// Current state, reconstructed from the backend on first access.
    pub async fn get_state(&self) -> SetupState {
        self.seed_state_from_backend().await;
        self.context.get_state().await
    }

    pub async fn session_snapshot(&self) -> SetupSession {
        self.context.snapshot().await
    }

    pub async fn new_space(&self) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::StartNewSpace).await
    }

    pub async fn join_space(&self) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::StartJoinSpace).await
    }

    pub async fn select_device(&self, peer_id: PeerId) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::SelectPeer { peer_id }).await
    }

    pub async fn submit_passphrase(
        &self,
        passphrase: SecretString,
        confirm: SecretString,
    ) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::SubmitPassphrase {
            passphrase,
            confirm,
        })
        .await
    }

    pub async fn verify_passphrase(
        &self,
        passphrase: SecretString,
    ) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::VerifyPassphrase { passphrase }).await
    }

    pub async fn confirm_peer_trust(&self) -> Result<SetupState, TransportError> {
        self.dispatch(SetupEvent::ConfirmPeerTrust).await
    }

    /// Abandon the attempt. Local state resets synchronously; the backend
    /// call runs afterwards and its failure is not surfaced, which makes
    /// repeated cancels safe.
    pub async fn cancel_setup(&self) -> SetupState {
        self.dispatch(SetupEvent::CancelSetup)
            .await
            .unwrap_or(SetupState::Welcome)
    }

    /// Apply a fence-admitted `setup-state-changed` push.
    pub async fn apply_push(&self, push: SetupStateChanged) -> SetupState {
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;
        let span = info_span!("setup.apply_push", state = push.state.discriminant());
        async {
            self.context
                .record_event(push.session_id.clone(), push.ts)
                .await;

            let current = self.context.get_state().await;
            let (next, _) = SetupStateMachine::transition(
                current.clone(),
                SetupEvent::Authoritative { state: push.state },
            );
            if next != current {
                info!(from = ?current, to = ?next, "setup state replaced by push");
                self.set_state_and_emit(next.clone()).await;
            }
            if next.is_terminal() {
                self.finish_attempt().await;
            }
            next
        }
        .instrument(span)
        .await
    }

    /// The backend notification channel died. Surfaces a timeout on the
    /// in-flight node instead of silently reverting.
    pub async fn handle_channel_closed(&self) {
        warn!("backend notification channel closed");
        let _ = self.dispatch(SetupEvent::ChannelClosed).await;
    }

    async fn dispatch(&self, event: SetupEvent) -> Result<SetupState, TransportError> {
        // Serialize concurrent dispatch calls: two callers must never read
        // the same state and race their backend calls.
        let _dispatch_guard = self.context.acquire_dispatch_lock().await;

        let span = info_span!("setup.dispatch", event = ?event);
        async {
            let mut current = self.context.get_state().await;
            let mut pending_events = vec![event];

            while let Some(event) = pending_events.pop() {
                let from = current.clone();
                let (next, actions) = SetupStateMachine::transition(current, event);
                if next != from {
                    info!(from = ?from, to = ?next, "setup state transition");
                    self.set_state_and_emit(next.clone()).await;
                    if next.is_terminal() {
                        self.finish_attempt().await;
                    }
                }
                current = next;
                pending_events.extend(self.execute_actions(actions).await?);
            }

            Ok(current)
        }
        .instrument(span)
        .await
    }

    async fn execute_actions(
        &self,
        actions: Vec<SetupAction>,
    ) -> Result<Vec<SetupEvent>, TransportError> {
        let mut follow_up = Vec::new();
        for action in actions {
            debug!(?action, "setup executing action");
            match action {
                SetupAction::CallStartNewSpace => {
                    let state = self.transport.start_new_space().await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallStartJoinSpace => {
                    let state = self.transport.start_join_space().await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallSelectDevice { peer_id } => {
                    let state = self.transport.select_device(&peer_id).await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallSubmitPassphrase {
                    passphrase,
                    confirm,
                } => {
                    let state = self.transport.submit_passphrase(passphrase, confirm).await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallVerifyPassphrase { passphrase } => {
                    let state = self.transport.verify_passphrase(passphrase).await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallConfirmPeerTrust => {
                    let state = self.transport.confirm_peer_trust().await?;
                    follow_up.push(SetupEvent::Authoritative { state });
                }
                SetupAction::CallCancelSetup => {
                    // Local reset already happened when Welcome was applied.
                    self.finish_attempt().await;
                    if let Err(err) = self.transport.cancel_setup().await {
                        warn!(error = %err, "backend cancel failed; local state already reset");
                    }
                }
            }
        }

        Ok(follow_up)
    }

    async fn set_state_and_emit(&self, state: SetupState) {
        self.context.set_state(state.clone()).await;
        let session_id = self.context.session_id().await;
        self.events.emit_setup_state_changed(state, session_id).await;
    }

    /// Drop all attempt-scoped data: fence session, seen keys, session id.
    async fn finish_attempt(&self) {
        self.fence.lock().await.release();
        self.context.reset_attempt().await;
    }

    async fn seed_state_from_backend(&self) {
        if self.seeded.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.transport.get_setup_state().await {
            Ok(state) => {
                let current = self.context.get_state().await;
                if state != current {
                    self.set_state_and_emit(state).await;
                }
            }
            Err(err) => {
                error!(error = %err, "failed to load setup state from backend");
            }
        }
    }
}
