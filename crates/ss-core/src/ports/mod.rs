//! Ports consumed and exposed by the orchestration core.
//!
//! The negotiation backend sits behind the transport ports; the presentation
//! layer sits behind the event ports. Both sides are injected as trait
//! objects and mocked in tests.

pub mod pairing_transport;
pub mod setup_event_port;
pub mod setup_transport;

pub use pairing_transport::{PairingTicket, PairingTransportPort};
pub use setup_event_port::SetupEventPort;
pub use setup_transport::SetupTransportPort;

/// Transport-level failure of a backend request.
///
/// Domain refusals never surface here — the backend attaches those to the
/// returned state. This error class is always retriable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("backend request timed out")]
    Timeout,
    #[error("backend notification channel closed")]
    ChannelClosed,
    #[error("selected peer is unavailable")]
    PeerUnavailable,
    #[error("backend failure: {0}")]
    Backend(String),
}
