use crate::{ids::PeerId, security::SecretString};

/// Backend calls requested by a state transition.
///
/// The orchestrator executes these against the setup transport port; each
/// call's response feeds back in as `SetupEvent::Authoritative`.
#[derive(Debug)]
pub enum SetupAction {
    CallStartNewSpace,
    CallStartJoinSpace,
    CallSelectDevice {
        peer_id: PeerId,
    },
    CallSubmitPassphrase {
        passphrase: SecretString,
        confirm: SecretString,
    },
    CallVerifyPassphrase {
        passphrase: SecretString,
    },
    CallConfirmPeerTrust,

    /// Tell the backend to abandon the attempt. Local state is already reset
    /// when this runs; failures are ignored.
    CallCancelSetup,
}
