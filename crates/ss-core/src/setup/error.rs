use serde::{Deserialize, Serialize};

/// Setup error types.
///
/// Validation errors are attached to the state node that can exhibit them and
/// cleared when that node is left. Transport errors are recoverable in place;
/// protocol refusals end the current attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupError {
    PassphraseMismatch,
    PassphraseEmpty,
    PassphraseTooShort { min_len: usize },
    PassphraseInvalidOrMismatch,
    NetworkTimeout,
    PeerUnavailable,
    PairingRejected,
    PairingFailed,
}
