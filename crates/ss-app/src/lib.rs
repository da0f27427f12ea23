//! SyncSpace setup orchestration layer.
//!
//! Sits between user intents (create or join a shared encrypted space), the
//! negotiation backend that owns all cryptographic and network state, and
//! the out-of-band short-code verification step. The backend's direct
//! command responses and its pushed notifications are reconciled into one
//! consistent, exactly-once state transition sequence by the session fence.

pub mod channel;
pub mod facade;
pub mod pairing;
pub mod registry;
pub mod runtime;
pub mod setup;

pub use channel::{EventChannel, Subscription};
pub use facade::{CommandError, PairingFacade, SetupFacade};
pub use registry::{ActiveRegistration, ListenerRegistry, RegistrationGuard};
pub use runtime::{OrchestratorDeps, SetupRuntime};
