use crate::{ids::PeerId, security::SecretString, setup::SetupState};

/// Events that drive the setup flow.
///
/// Command variants originate from user intents; `Authoritative` carries the
/// backend-supplied next state (direct response or corroborating push) and
/// `ChannelClosed` signals that the notification channel died mid-flow.
#[derive(Debug)]
pub enum SetupEvent {
    // Path selection
    StartNewSpace,
    StartJoinSpace,

    // Create space
    SubmitPassphrase {
        passphrase: SecretString,
        confirm: SecretString,
    },

    // Join space
    SelectPeer {
        peer_id: PeerId,
    },
    ConfirmPeerTrust,
    VerifyPassphrase {
        passphrase: SecretString,
    },

    // Backend results
    Authoritative {
        state: SetupState,
    },
    ChannelClosed,

    // Control
    CancelSetup,
}
