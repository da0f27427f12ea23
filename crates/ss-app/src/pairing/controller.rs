//! Pairing verification controller.
//!
//! Manages the PIN-confirmation sub-flow, standalone or layered under the
//! setup flow. All inbound notifications reach it already fence-admitted;
//! every timer here is client-owned and cancelled on teardown. Command
//! failures while `Requested` or `Verifying` revert to idle and release the
//! session — retry always requires a fresh user action.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info_span, warn, Instrument};

use ss_core::{
    events::{PairingRequest, PairingVerification, VerificationKind},
    fence::SessionFence,
    ids::{PeerId, SessionId},
    pairing::{PairingAttempt, PairingPhase},
    ports::{PairingTicket, PairingTransportPort, TransportError},
};

use crate::pairing::{config::PairingConfig, events::PairingUiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TimerKind {
    DecisionWindow,
    CompletionDisplay,
}

/// Orchestrator for one pairing attempt at a time.
#[derive(Clone)]
pub struct PairingController {
    config: PairingConfig,
    fence: Arc<Mutex<SessionFence>>,
    attempt: Arc<Mutex<Option<PairingAttempt>>>,
    transport: Arc<dyn PairingTransportPort>,
    event_senders: Arc<Mutex<Vec<mpsc::Sender<PairingUiEvent>>>>,
    timers: Arc<Mutex<HashMap<TimerKind, AbortHandle>>>,
}

impl PairingController {
    pub fn new(
        config: PairingConfig,
        fence: Arc<Mutex<SessionFence>>,
        transport: Arc<dyn PairingTransportPort>,
    ) -> Self {
        Self {
            config,
            fence,
            attempt: Arc::new(Mutex::new(None)),
            transport,
            event_senders: Arc::new(Mutex::new(Vec::new())),
            timers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to pairing progress events.
    pub async fn subscribe(&self) -> mpsc::Receiver<PairingUiEvent> {
        let (tx, rx) = mpsc::channel(32);
        self.event_senders.lock().await.push(tx);
        rx
    }

    pub async fn current_attempt(&self) -> Option<PairingAttempt> {
        self.attempt.lock().await.clone()
    }

    /// Start pairing with a peer (initiator side). Adopts the returned
    /// session id as the fence's active session.
    pub async fn initiate(&self, peer_id: &PeerId) -> Result<PairingTicket, TransportError> {
        let span = info_span!("pairing.initiate", peer_id = %peer_id);
        async {
            let ticket = self.transport.initiate_pairing(peer_id).await?;
            if ticket.success {
                if let Some(session_id) = &ticket.session_id {
                    self.fence.lock().await.adopt(session_id.clone());
                    *self.attempt.lock().await = Some(PairingAttempt::new(
                        session_id.clone(),
                        peer_id.clone(),
                        None,
                    ));
                }
            }
            Ok(ticket)
        }
        .instrument(span)
        .await
    }

    /// Fence-admitted inbound pairing request (responder side).
    pub async fn handle_request(&self, request: PairingRequest) {
        let span = info_span!("pairing.handle_request", session_id = %request.session_id);
        async {
            let attempt = PairingAttempt::new(
                request.session_id.clone(),
                request.peer_id,
                request.device_name,
            );
            *self.attempt.lock().await = Some(attempt.clone());
            self.start_decision_timer(request.session_id).await;
            self.emit_event(PairingUiEvent::RequestReceived { attempt })
                .await;
        }
        .instrument(span)
        .await
    }

    /// Fence-admitted pairing-verification notification.
    pub async fn handle_verification(&self, verification: PairingVerification) {
        let span = info_span!(
            "pairing.handle_verification",
            session_id = %verification.session_id,
            kind = verification.kind.as_str()
        );
        async {
            match verification.kind {
                VerificationKind::Request => {
                    let Some(peer_id) = verification.peer_id else {
                        warn!("pairing request notification without peer id");
                        return;
                    };
                    self.handle_request(PairingRequest {
                        session_id: verification.session_id,
                        peer_id,
                        device_name: verification.device_name,
                    })
                    .await;
                }
                VerificationKind::Verification => {
                    self.cancel_timer(TimerKind::DecisionWindow).await;
                    let updated = {
                        let mut guard = self.attempt.lock().await;
                        let Some(attempt) = guard.as_mut() else {
                            warn!("verification code for unknown attempt");
                            return;
                        };
                        attempt.phase = PairingPhase::VerificationCodeReady;
                        attempt.code = verification.code;
                        if verification.device_name.is_some() {
                            attempt.device_name = verification.device_name;
                        }
                        attempt.clone()
                    };
                    self.emit_event(PairingUiEvent::VerificationReady { attempt: updated })
                        .await;
                }
                VerificationKind::Verifying => {
                    let session_id = verification.session_id;
                    if let Some(attempt) = self.attempt.lock().await.as_mut() {
                        attempt.phase = PairingPhase::Verifying;
                    }
                    self.emit_event(PairingUiEvent::AwaitingPeer { session_id })
                        .await;
                }
                VerificationKind::Complete => {
                    if let Some(attempt) = self.attempt.lock().await.as_mut() {
                        attempt.phase = PairingPhase::Complete;
                    }
                    self.finish_complete(verification.session_id).await;
                }
                VerificationKind::Failed => {
                    let error = verification
                        .error
                        .unwrap_or_else(|| "pairing failed".to_string());
                    if let Some(attempt) = self.attempt.lock().await.as_mut() {
                        attempt.phase = PairingPhase::Failed;
                        attempt.error = Some(error.clone());
                    }
                    self.emit_event(PairingUiEvent::Failed {
                        session_id: verification.session_id,
                        error,
                    })
                    .await;
                    self.teardown().await;
                }
            }
        }
        .instrument(span)
        .await
    }

    /// User accepted the inbound request.
    pub async fn accept(&self, session_id: &SessionId) -> Result<(), TransportError> {
        let span = info_span!("pairing.accept", session_id = %session_id);
        async {
            self.cancel_timer(TimerKind::DecisionWindow).await;
            match self.transport.accept_pairing(session_id).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!(error = %err, "accept failed; reverting to idle");
                    self.teardown().await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// User rejected the inbound request. Local teardown happens regardless
    /// of whether the backend call succeeds.
    pub async fn reject(
        &self,
        session_id: &SessionId,
        peer_id: &PeerId,
    ) -> Result<(), TransportError> {
        let span = info_span!("pairing.reject", session_id = %session_id);
        async {
            let result = self.transport.reject_pairing(session_id, peer_id).await;
            self.teardown().await;
            result
        }
        .instrument(span)
        .await
    }

    /// User's short-code judgment. A no-match tears the attempt down locally
    /// immediately, without waiting for backend acknowledgment.
    pub async fn confirm_pin(
        &self,
        session_id: &SessionId,
        pin_matches: bool,
    ) -> Result<(), TransportError> {
        let span = info_span!(
            "pairing.confirm_pin",
            session_id = %session_id,
            pin_matches
        );
        async {
            if !pin_matches {
                let transport = Arc::clone(&self.transport);
                let session_id = session_id.clone();
                tokio::spawn(async move {
                    if let Err(err) = transport.verify_pairing_pin(&session_id, false).await {
                        warn!(error = %err, "pin rejection call failed");
                    }
                });
                self.teardown().await;
                return Ok(());
            }

            {
                let mut guard = self.attempt.lock().await;
                if let Some(attempt) = guard.as_mut() {
                    attempt.phase = PairingPhase::Verifying;
                }
            }
            self.emit_event(PairingUiEvent::AwaitingPeer {
                session_id: session_id.clone(),
            })
            .await;

            match self.transport.verify_pairing_pin(session_id, true).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!(error = %err, "pin confirmation failed; reverting to idle");
                    self.teardown().await;
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Abandon the current attempt, telling the backend best-effort.
    pub async fn cancel(&self) {
        let current = self.attempt.lock().await.clone();
        if let Some(attempt) = current {
            if let Err(err) = self
                .transport
                .reject_pairing(&attempt.session_id, &attempt.peer_id)
                .await
            {
                warn!(error = %err, session_id = %attempt.session_id, "cancel reject failed");
            }
        }
        self.teardown().await;
    }

    async fn start_decision_timer(&self, session_id: SessionId) {
        let controller = self.clone();
        let window = self.config.decision_window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            controller.expire_request(session_id).await;
        })
        .abort_handle();

        if let Some(previous) = self
            .timers
            .lock()
            .await
            .insert(TimerKind::DecisionWindow, handle)
        {
            previous.abort();
        }
    }

    /// No decision inside the window ⇒ implicit reject.
    async fn expire_request(&self, session_id: SessionId) {
        let expired = {
            let guard = self.attempt.lock().await;
            matches!(
                guard.as_ref(),
                Some(attempt)
                    if attempt.session_id == session_id
                        && attempt.phase == PairingPhase::Requested
            )
        };
        if !expired {
            return;
        }

        debug!(session_id = %session_id, "decision window elapsed, auto-rejecting");
        // Own timer task: drop the handle so teardown does not abort us
        // mid-cleanup.
        self.timers.lock().await.remove(&TimerKind::DecisionWindow);

        let peer_id = self
            .attempt
            .lock()
            .await
            .as_ref()
            .map(|attempt| attempt.peer_id.clone());
        if let Some(peer_id) = peer_id {
            if let Err(err) = self.transport.reject_pairing(&session_id, &peer_id).await {
                warn!(error = %err, "auto-reject call failed");
            }
        }
        self.emit_event(PairingUiEvent::RequestExpired {
            session_id: session_id.clone(),
        })
        .await;
        self.teardown().await;
    }

    /// First admitted `complete`: hold the final screen briefly, then
    /// announce success and release the session. Duplicate completes never
    /// reach this point (fence dedupe), so success fires exactly once.
    async fn finish_complete(&self, session_id: SessionId) {
        self.cancel_timer(TimerKind::DecisionWindow).await;

        let controller = self.clone();
        let delay = self.config.completion_display_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            controller
                .timers
                .lock()
                .await
                .remove(&TimerKind::CompletionDisplay);
            controller
                .emit_event(PairingUiEvent::Succeeded { session_id })
                .await;
            controller.teardown().await;
        })
        .abort_handle();

        if let Some(previous) = self
            .timers
            .lock()
            .await
            .insert(TimerKind::CompletionDisplay, handle)
        {
            previous.abort();
        }
    }

    async fn cancel_timer(&self, kind: TimerKind) {
        if let Some(handle) = self.timers.lock().await.remove(&kind) {
            handle.abort();
        }
    }

    /// Back to idle: cancel timers, drop the attempt, release the fence.
    async fn teardown(&self) {
        let handles: Vec<AbortHandle> = {
            let mut timers = self.timers.lock().await;
            timers.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.abort();
        }
        *self.attempt.lock().await = None;
        self.fence.lock().await.release();
    }

    async fn emit_event(&self, event: PairingUiEvent) {
        let senders = { self.event_senders.lock().await.clone() };
        for sender in senders {
            if sender.send(event.clone()).await.is_err() {
                debug!("pairing event receiver dropped");
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::pairing::events::PairingEventPort for PairingController {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<PairingUiEvent>> {
        Ok(PairingController::subscribe(self).await)
    }
}
