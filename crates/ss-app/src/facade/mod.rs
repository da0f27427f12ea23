//! Command facade.
//!
//! One request/response function per user intent, with uniform error
//! translation: transport failures surface as the typed errors below, domain
//! refusals pass through unchanged attached to the returned state. Every
//! function is idempotent from the caller's perspective.

pub mod pairing;
pub mod setup;

pub use pairing::PairingFacade;
pub use setup::SetupFacade;

use ss_core::ports::TransportError;

/// The only error class a facade call can raise. Everything else is data on
/// the returned state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("the operation timed out, check the connection and retry")]
    NetworkTimeout,
    #[error("the selected device is unavailable")]
    PeerUnavailable,
}

impl From<TransportError> for CommandError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::PeerUnavailable => CommandError::PeerUnavailable,
            TransportError::Timeout
            | TransportError::ChannelClosed
            | TransportError::Backend(_) => CommandError::NetworkTimeout,
        }
    }
}
