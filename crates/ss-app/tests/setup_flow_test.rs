use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::time::{sleep, Duration, Instant};

use ss_app::{EventChannel, OrchestratorDeps, SetupRuntime};
use ss_core::events::{Notification, SetupStateChanged};
use ss_core::ids::{PeerId, SessionId};
use ss_core::ports::{
    PairingTicket, PairingTransportPort, SetupEventPort, SetupTransportPort, TransportError,
};
use ss_core::security::SecretString;
use ss_core::setup::SetupError;
use ss_core::SetupState;

/// Backend double that answers every setup command the way the real
/// negotiation backend would for a happy path.
#[derive(Default)]
struct ScriptedSetupTransport {
    cancel_calls: AtomicUsize,
}

#[async_trait]
impl SetupTransportPort for ScriptedSetupTransport {
    async fn get_setup_state(&self) -> Result<SetupState, TransportError> {
        Ok(SetupState::Welcome)
    }

    async fn start_new_space(&self) -> Result<SetupState, TransportError> {
        Ok(SetupState::CreateSpaceInputPassphrase { error: None })
    }

    async fn start_join_space(&self) -> Result<SetupState, TransportError> {
        Ok(SetupState::JoinSpaceSelectDevice { error: None })
    }

    async fn select_device(&self, _peer_id: &PeerId) -> Result<SetupState, TransportError> {
        Ok(SetupState::JoinSpaceConfirmPeer {
            short_code: "482913".to_string(),
            peer_fingerprint: Some("fp-remote".to_string()),
            error: None,
        })
    }

    async fn submit_passphrase(
        &self,
        _passphrase: SecretString,
        _confirm: SecretString,
    ) -> Result<SetupState, TransportError> {
        Ok(SetupState::ProcessingCreateSpace {
            message: Some("Creating your encrypted space".to_string()),
        })
    }

    async fn verify_passphrase(
        &self,
        passphrase: SecretString,
    ) -> Result<SetupState, TransportError> {
        if passphrase.expose() == "join-secret" {
            Ok(SetupState::ProcessingJoinSpace {
                message: Some("Verifying passphrase".to_string()),
            })
        } else {
            Ok(SetupState::JoinSpaceInputPassphrase {
                error: Some(SetupError::PassphraseInvalidOrMismatch),
            })
        }
    }

    async fn confirm_peer_trust(&self) -> Result<SetupState, TransportError> {
        Ok(SetupState::ProcessingJoinSpace {
            message: Some("Waiting for peer".to_string()),
        })
    }

    async fn cancel_setup(&self) -> Result<(), TransportError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Transport whose commands all die on the wire.
struct TimeoutSetupTransport;

#[async_trait]
impl SetupTransportPort for TimeoutSetupTransport {
    async fn get_setup_state(&self) -> Result<SetupState, TransportError> {
        Ok(SetupState::Welcome)
    }

    async fn start_new_space(&self) -> Result<SetupState, TransportError> {
        Err(TransportError::Timeout)
    }

    async fn start_join_space(&self) -> Result<SetupState, TransportError> {
        Err(TransportError::Timeout)
    }

    async fn select_device(&self, _peer_id: &PeerId) -> Result<SetupState, TransportError> {
        Err(TransportError::PeerUnavailable)
    }

    async fn submit_passphrase(
        &self,
        _passphrase: SecretString,
        _confirm: SecretString,
    ) -> Result<SetupState, TransportError> {
        Err(TransportError::Timeout)
    }

    async fn verify_passphrase(
        &self,
        _passphrase: SecretString,
    ) -> Result<SetupState, TransportError> {
        Err(TransportError::Timeout)
    }

    async fn confirm_peer_trust(&self) -> Result<SetupState, TransportError> {
        Err(TransportError::Timeout)
    }

    async fn cancel_setup(&self) -> Result<(), TransportError> {
        Err(TransportError::Timeout)
    }
}

struct NoopPairingTransport;

#[async_trait]
impl PairingTransportPort for NoopPairingTransport {
    async fn initiate_pairing(&self, _peer_id: &PeerId) -> Result<PairingTicket, TransportError> {
        Ok(PairingTicket {
            session_id: Some(SessionId::generate()),
            success: true,
            error: None,
        })
    }

    async fn accept_pairing(&self, _session_id: &SessionId) -> Result<(), TransportError> {
        Ok(())
    }

    async fn reject_pairing(
        &self,
        _session_id: &SessionId,
        _peer_id: &PeerId,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn verify_pairing_pin(
        &self,
        _session_id: &SessionId,
        _pin_matches: bool,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSetupEvents {
    emitted: tokio::sync::Mutex<Vec<(SetupState, Option<SessionId>)>>,
}

impl RecordingSetupEvents {
    async fn snapshot(&self) -> Vec<(SetupState, Option<SessionId>)> {
        self.emitted.lock().await.clone()
    }
}

#[async_trait]
impl SetupEventPort for RecordingSetupEvents {
    async fn emit_setup_state_changed(&self, state: SetupState, session_id: Option<SessionId>) {
        self.emitted.lock().await.push((state, session_id));
    }
}

struct Harness {
    runtime: Arc<SetupRuntime>,
    setup_transport: Arc<ScriptedSetupTransport>,
    events: Arc<RecordingSetupEvents>,
}

fn build_runtime() -> Harness {
    let setup_transport = Arc::new(ScriptedSetupTransport::default());
    let events = Arc::new(RecordingSetupEvents::default());
    let runtime = SetupRuntime::new(OrchestratorDeps {
        setup_transport: setup_transport.clone(),
        pairing_transport: Arc::new(NoopPairingTransport),
        setup_events: events.clone(),
        pairing_config: Default::default(),
    });
    Harness {
        runtime,
        setup_transport,
        events,
    }
}

fn state_push(session: &str, state: SetupState, secs: i64) -> Notification {
    Notification::SetupStateChanged(SetupStateChanged {
        session_id: Some(session.into()),
        state,
        source: Some("backend".to_string()),
        ts: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
    })
}

#[tokio::test]
async fn create_space_happy_path_settles_at_completed() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    let state = facade.start_new_space().await.unwrap();
    assert_eq!(state, SetupState::CreateSpaceInputPassphrase { error: None });

    let state = facade
        .submit_passphrase("space-secret".to_string(), "space-secret".to_string())
        .await
        .unwrap();
    assert!(matches!(state, SetupState::ProcessingCreateSpace { .. }));

    harness
        .runtime
        .handle_notification(state_push("s-create-1", SetupState::Completed, 0))
        .await;

    assert_eq!(facade.get_setup_state().await, SetupState::Completed);
}

#[tokio::test]
async fn mismatched_passphrases_stay_on_input_node_with_error() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    facade.start_new_space().await.unwrap();
    let state = facade
        .submit_passphrase("abc".to_string(), "xyz".to_string())
        .await
        .unwrap();
    assert_eq!(
        state,
        SetupState::CreateSpaceInputPassphrase {
            error: Some(SetupError::PassphraseMismatch)
        }
    );

    let state = facade
        .submit_passphrase("short".to_string(), "short".to_string())
        .await
        .unwrap();
    assert_eq!(
        state,
        SetupState::CreateSpaceInputPassphrase {
            error: Some(SetupError::PassphraseTooShort { min_len: 8 })
        }
    );
}

#[tokio::test]
async fn join_space_scenario_settles_at_completed() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    let state = facade.start_join_space().await.unwrap();
    assert_eq!(state, SetupState::JoinSpaceSelectDevice { error: None });

    let state = facade.select_device("P1".to_string()).await.unwrap();
    assert_eq!(
        state,
        SetupState::JoinSpaceConfirmPeer {
            short_code: "482913".to_string(),
            peer_fingerprint: Some("fp-remote".to_string()),
            error: None,
        }
    );

    let state = facade.confirm_peer_trust().await.unwrap();
    assert_eq!(
        state,
        SetupState::ProcessingJoinSpace {
            message: Some("Waiting for peer".to_string())
        }
    );

    harness
        .runtime
        .handle_notification(state_push("s-join-1", SetupState::Completed, 0))
        .await;

    assert_eq!(facade.get_setup_state().await, SetupState::Completed);
}

#[tokio::test]
async fn duplicate_completed_pushes_emit_once() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    facade.start_join_space().await.unwrap();
    let push = state_push("s-dup-1", SetupState::Completed, 0);
    harness.runtime.handle_notification(push.clone()).await;
    harness.runtime.handle_notification(push.clone()).await;
    harness.runtime.handle_notification(push).await;

    let completions = harness
        .events
        .snapshot()
        .await
        .into_iter()
        .filter(|(state, _)| *state == SetupState::Completed)
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn foreign_session_push_leaves_state_unchanged() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    facade.start_join_space().await.unwrap();
    harness
        .runtime
        .handle_notification(state_push(
            "s-mine",
            SetupState::ProcessingJoinSpace { message: None },
            0,
        ))
        .await;

    // Cross-talk from another attempt must be dropped silently.
    harness
        .runtime
        .handle_notification(state_push("s-other", SetupState::Completed, 1))
        .await;

    assert_eq!(
        facade.get_setup_state().await,
        SetupState::ProcessingJoinSpace { message: None }
    );
}

#[tokio::test]
async fn cancel_always_returns_to_welcome_and_clears_attempt() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();

    facade.start_join_space().await.unwrap();
    facade.select_device("P1".to_string()).await.unwrap();
    harness
        .runtime
        .handle_notification(state_push(
            "s-cancel-1",
            SetupState::ProcessingJoinSpace { message: None },
            0,
        ))
        .await;

    assert_eq!(facade.cancel_setup().await, SetupState::Welcome);
    let session = facade.get_setup_session().await;
    assert!(session.session_id.is_none());
    assert!(session.last_event_timestamp.is_none());

    // Stragglers for the cancelled attempt are fenced out.
    harness
        .runtime
        .handle_notification(state_push("s-cancel-1", SetupState::Completed, 5))
        .await;
    assert_eq!(facade.get_setup_state().await, SetupState::Welcome);

    // Cancelling twice is safe.
    assert_eq!(facade.cancel_setup().await, SetupState::Welcome);
    assert_eq!(harness.setup_transport.cancel_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transport_failure_surfaces_as_network_timeout_and_keeps_node() {
    let events = Arc::new(RecordingSetupEvents::default());
    let runtime = SetupRuntime::new(OrchestratorDeps {
        setup_transport: Arc::new(TimeoutSetupTransport),
        pairing_transport: Arc::new(NoopPairingTransport),
        setup_events: events.clone(),
        pairing_config: Default::default(),
    });
    let facade = runtime.setup_facade();

    let err = facade.start_new_space().await.unwrap_err();
    assert_eq!(err, ss_app::CommandError::NetworkTimeout);
    assert_eq!(facade.get_setup_state().await, SetupState::Welcome);
}

#[tokio::test]
async fn channel_close_mid_processing_surfaces_timeout() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();
    let channel = EventChannel::new();
    let _guard = harness.runtime.attach_listeners(&channel);

    facade.start_join_space().await.unwrap();
    facade.select_device("P1".to_string()).await.unwrap();
    facade.confirm_peer_trust().await.unwrap();
    assert!(facade.get_setup_state().await.is_processing());

    channel.close();

    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        let state = facade.get_setup_state().await;
        if state
            == (SetupState::JoinSpaceInputPassphrase {
                error: Some(SetupError::NetworkTimeout),
            })
        {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "channel close never surfaced a timeout, state: {:?}",
            state
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn wire_level_pushes_reach_the_state_machine() {
    let harness = build_runtime();
    let facade = harness.runtime.setup_facade();
    let channel = EventChannel::new();
    let _guard = harness.runtime.attach_listeners(&channel);

    facade.start_join_space().await.unwrap();
    channel.publish_raw(
        "setup-state-changed",
        serde_json::json!({
            "sessionId": "s-wire-1",
            "state": { "ProcessingJoinSpace": { "message": "Waiting for peer" } },
            "source": "backend",
            "ts": "2025-11-04T10:00:00Z",
        }),
    );

    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if facade.get_setup_state().await.is_processing() {
            break;
        }
        assert!(Instant::now() < deadline, "push never applied");
        sleep(Duration::from_millis(10)).await;
    }

    let session = facade.get_setup_session().await;
    assert_eq!(session.session_id, Some("s-wire-1".into()));
    assert!(session.last_event_timestamp.is_some());
}

#[tokio::test]
async fn repeated_attach_installs_listeners_once() {
    let harness = build_runtime();
    let channel = EventChannel::new();

    let first = harness.runtime.attach_listeners(&channel);
    let second = harness.runtime.attach_listeners(&channel);
    drop(first);
    let third = harness.runtime.attach_listeners(&channel);

    for topic in ss_core::events::topics::ALL {
        assert_eq!(channel.listener_count(topic), 1, "topic {topic}");
    }

    drop(second);
    drop(third);
    for topic in ss_core::events::topics::ALL {
        assert_eq!(channel.listener_count(topic), 0, "topic {topic}");
    }
}
