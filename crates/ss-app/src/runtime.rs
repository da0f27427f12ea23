//! Runtime wiring.
//!
//! Assembles the fence, controllers and facades around the injected ports,
//! and routes fence-admitted notifications from the event channel to the
//! owning controller. The command path and the push path are two producers
//! feeding the same idempotent consumer.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use ss_core::{
    events::{topics, Notification},
    fence::{FenceDecision, SessionFence},
    ports::{PairingTransportPort, SetupEventPort, SetupTransportPort},
};

use crate::{
    channel::EventChannel,
    facade::{PairingFacade, SetupFacade},
    pairing::{PairingConfig, PairingController},
    registry::{ActiveRegistration, ListenerRegistry, RegistrationGuard},
    setup::SetupController,
};

/// Injected collaborators.
pub struct OrchestratorDeps {
    pub setup_transport: Arc<dyn SetupTransportPort>,
    pub pairing_transport: Arc<dyn PairingTransportPort>,
    pub setup_events: Arc<dyn SetupEventPort>,
    pub pairing_config: PairingConfig,
}

/// Fence plus controller dispatch, cloneable into the router task.
#[derive(Clone)]
struct NotificationRouter {
    fence: Arc<Mutex<SessionFence>>,
    setup: Arc<SetupController>,
    pairing: Arc<PairingController>,
}

impl NotificationRouter {
    /// Run one notification through the fence and, if admitted, the owning
    /// controller.
    async fn route(&self, notification: Notification) {
        let decision = self.fence.lock().await.admit(&notification);
        match decision {
            FenceDecision::Admit => {}
            decision => {
                debug!(
                    topic = notification.topic(),
                    ?decision,
                    "notification fenced out"
                );
                return;
            }
        }

        match notification {
            Notification::SetupStateChanged(push) => {
                self.setup.apply_push(push).await;
            }
            Notification::PairingRequest(request) => {
                self.pairing.handle_request(request).await;
            }
            Notification::PairingVerification(verification) => {
                self.pairing.handle_verification(verification).await;
            }
        }
    }
}

/// The assembled orchestration core.
pub struct SetupRuntime {
    router: NotificationRouter,
    registry: ListenerRegistry,
}

impl SetupRuntime {
    pub fn new(deps: OrchestratorDeps) -> Arc<Self> {
        let fence = Arc::new(Mutex::new(SessionFence::new()));
        let setup = Arc::new(SetupController::new(
            Arc::clone(&fence),
            deps.setup_transport,
            deps.setup_events,
        ));
        let pairing = Arc::new(PairingController::new(
            deps.pairing_config,
            Arc::clone(&fence),
            deps.pairing_transport,
        ));

        Arc::new(Self {
            router: NotificationRouter {
                fence,
                setup,
                pairing,
            },
            registry: ListenerRegistry::new(),
        })
    }

    pub fn setup_controller(&self) -> Arc<SetupController> {
        Arc::clone(&self.router.setup)
    }

    pub fn pairing_controller(&self) -> Arc<PairingController> {
        Arc::clone(&self.router.pairing)
    }

    pub fn setup_facade(&self) -> SetupFacade {
        SetupFacade::new(self.setup_controller())
    }

    pub fn pairing_facade(&self) -> PairingFacade {
        PairingFacade::new(self.pairing_controller())
    }

    /// Install the backend notification listeners.
    ///
    /// Safe to call from every mount; the registry guarantees a single
    /// underlying subscription set per process. Keep the guard alive for the
    /// listener lifetime. Must run inside a tokio runtime.
    pub fn attach_listeners(&self, channel: &EventChannel) -> RegistrationGuard {
        self.registry.acquire(|| {
            let (tx, mut rx) = mpsc::channel::<Notification>(64);

            let subscriptions = topics::ALL
                .iter()
                .map(|topic| {
                    let tx = tx.clone();
                    channel.subscribe(topic, move |notification| {
                        if tx.try_send(notification.clone()).is_err() {
                            warn!(
                                topic = notification.topic(),
                                "notification queue full, dropping"
                            );
                        }
                    })
                })
                .collect();

            let router = self.router.clone();
            let task = tokio::spawn(async move {
                while let Some(notification) = rx.recv().await {
                    router.route(notification).await;
                }
                // Every sender lives in a channel handler; all of them gone
                // means the backend notification channel itself closed.
                router.setup.handle_channel_closed().await;
            })
            .abort_handle();

            ActiveRegistration {
                subscriptions,
                tasks: vec![task],
            }
        })
    }

    /// Feed one notification directly, bypassing the [`EventChannel`]. Used
    /// by embedders with their own delivery mechanism, and by tests.
    pub async fn handle_notification(&self, notification: Notification) {
        self.router.route(notification).await;
    }
}
