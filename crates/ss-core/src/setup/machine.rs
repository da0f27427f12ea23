//! Setup state machine.
//!
//! Pure transition function for the onboarding flow. The next visible state
//! is always the one supplied by the negotiation backend — a command arm
//! never invents it, it only emits the backend call to perform. The single
//! exception is create-passphrase validation, which annotates the current
//! node without a backend round trip.

use crate::setup::{SetupAction, SetupError, SetupEvent, SetupState};

/// Minimum accepted passphrase length when creating a space.
pub const MIN_PASSPHRASE_LEN: usize = 8;

/// Pure setup state machine: no side effects.
pub struct SetupStateMachine;

impl SetupStateMachine {
    pub fn transition(state: SetupState, event: SetupEvent) -> (SetupState, Vec<SetupAction>) {
        match (state, event) {
            // An authoritative backend state replaces whatever is current.
            (_, SetupEvent::Authoritative { state }) => (state, Vec::new()),

            // Cancel resets locally first; the backend learns afterwards.
            (_, SetupEvent::CancelSetup) => {
                (SetupState::Welcome, vec![SetupAction::CallCancelSetup])
            }

            // Losing the notification channel mid-operation surfaces a
            // timeout on the owning input node, never a silent reset.
            (SetupState::ProcessingCreateSpace { .. }, SetupEvent::ChannelClosed) => (
                SetupState::CreateSpaceInputPassphrase {
                    error: Some(SetupError::NetworkTimeout),
                },
                Vec::new(),
            ),
            (SetupState::ProcessingJoinSpace { .. }, SetupEvent::ChannelClosed) => (
                SetupState::JoinSpaceInputPassphrase {
                    error: Some(SetupError::NetworkTimeout),
                },
                Vec::new(),
            ),

            // While an operation is in flight only cancel is admissible;
            // other commands are rejected rather than raced against a push.
            (state @ SetupState::ProcessingCreateSpace { .. }, _)
            | (state @ SetupState::ProcessingJoinSpace { .. }, _) => (state, Vec::new()),

            (SetupState::Welcome, SetupEvent::StartNewSpace) => {
                (SetupState::Welcome, vec![SetupAction::CallStartNewSpace])
            }
            (SetupState::Welcome, SetupEvent::StartJoinSpace) => {
                (SetupState::Welcome, vec![SetupAction::CallStartJoinSpace])
            }

            (
                SetupState::CreateSpaceInputPassphrase { .. },
                SetupEvent::SubmitPassphrase {
                    passphrase,
                    confirm,
                },
            ) => {
                if passphrase.expose().is_empty() {
                    return (
                        SetupState::CreateSpaceInputPassphrase {
                            error: Some(SetupError::PassphraseEmpty),
                        },
                        Vec::new(),
                    );
                }
                if passphrase.expose() != confirm.expose() {
                    return (
                        SetupState::CreateSpaceInputPassphrase {
                            error: Some(SetupError::PassphraseMismatch),
                        },
                        Vec::new(),
                    );
                }
                if passphrase.expose().chars().count() < MIN_PASSPHRASE_LEN {
                    return (
                        SetupState::CreateSpaceInputPassphrase {
                            error: Some(SetupError::PassphraseTooShort {
                                min_len: MIN_PASSPHRASE_LEN,
                            }),
                        },
                        Vec::new(),
                    );
                }
                (
                    SetupState::CreateSpaceInputPassphrase { error: None },
                    vec![SetupAction::CallSubmitPassphrase {
                        passphrase,
                        confirm,
                    }],
                )
            }

            (
                state @ SetupState::JoinSpaceSelectDevice { .. },
                SetupEvent::SelectPeer { peer_id },
            ) => (state, vec![SetupAction::CallSelectDevice { peer_id }]),

            (state @ SetupState::JoinSpaceConfirmPeer { .. }, SetupEvent::ConfirmPeerTrust) => {
                (state, vec![SetupAction::CallConfirmPeerTrust])
            }

            (
                state @ SetupState::JoinSpaceInputPassphrase { .. },
                SetupEvent::VerifyPassphrase { passphrase },
            ) => (state, vec![SetupAction::CallVerifyPassphrase { passphrase }]),

            // Commands that are not legal in the current node are ignored.
            (state, _event) => (state, Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::SecretString;

    fn submit(pass1: &str, pass2: &str) -> SetupEvent {
        SetupEvent::SubmitPassphrase {
            passphrase: SecretString::from(pass1),
            confirm: SecretString::from(pass2),
        }
    }

    #[test]
    fn welcome_start_new_space_requests_backend_call() {
        let (next, actions) =
            SetupStateMachine::transition(SetupState::Welcome, SetupEvent::StartNewSpace);
        assert_eq!(next, SetupState::Welcome);
        assert!(matches!(actions[..], [SetupAction::CallStartNewSpace]));
    }

    #[test]
    fn authoritative_state_replaces_current_node() {
        let (next, actions) = SetupStateMachine::transition(
            SetupState::Welcome,
            SetupEvent::Authoritative {
                state: SetupState::CreateSpaceInputPassphrase { error: None },
            },
        );
        assert_eq!(next, SetupState::CreateSpaceInputPassphrase { error: None });
        assert!(actions.is_empty());
    }

    #[test]
    fn mismatched_create_passphrases_set_error_without_backend_call() {
        let (next, actions) = SetupStateMachine::transition(
            SetupState::CreateSpaceInputPassphrase { error: None },
            submit("abcdefgh", "xyzabcde"),
        );
        assert_eq!(
            next,
            SetupState::CreateSpaceInputPassphrase {
                error: Some(SetupError::PassphraseMismatch)
            }
        );
        assert!(actions.is_empty());
    }

    #[test]
    fn empty_passphrase_sets_error() {
        let (next, _) = SetupStateMachine::transition(
            SetupState::CreateSpaceInputPassphrase { error: None },
            submit("", ""),
        );
        assert_eq!(
            next,
            SetupState::CreateSpaceInputPassphrase {
                error: Some(SetupError::PassphraseEmpty)
            }
        );
    }

    #[test]
    fn short_passphrase_reports_minimum_length() {
        let (next, _) = SetupStateMachine::transition(
            SetupState::CreateSpaceInputPassphrase { error: None },
            submit("short", "short"),
        );
        assert_eq!(
            next,
            SetupState::CreateSpaceInputPassphrase {
                error: Some(SetupError::PassphraseTooShort {
                    min_len: MIN_PASSPHRASE_LEN
                })
            }
        );
    }

    #[test]
    fn valid_passphrase_clears_error_and_calls_backend() {
        let (next, actions) = SetupStateMachine::transition(
            SetupState::CreateSpaceInputPassphrase {
                error: Some(SetupError::PassphraseMismatch),
            },
            submit("long-enough", "long-enough"),
        );
        assert_eq!(next, SetupState::CreateSpaceInputPassphrase { error: None });
        assert!(matches!(
            actions[..],
            [SetupAction::CallSubmitPassphrase { .. }]
        ));
    }

    #[test]
    fn cancel_returns_to_welcome_from_any_state() {
        let states = [
            SetupState::Welcome,
            SetupState::CreateSpaceInputPassphrase { error: None },
            SetupState::JoinSpaceSelectDevice { error: None },
            SetupState::JoinSpaceConfirmPeer {
                short_code: "482913".into(),
                peer_fingerprint: None,
                error: None,
            },
            SetupState::JoinSpaceInputPassphrase { error: None },
            SetupState::ProcessingCreateSpace { message: None },
            SetupState::ProcessingJoinSpace { message: None },
            SetupState::Completed,
        ];
        for state in states {
            let (next, actions) =
                SetupStateMachine::transition(state, SetupEvent::CancelSetup);
            assert_eq!(next, SetupState::Welcome);
            assert!(matches!(actions[..], [SetupAction::CallCancelSetup]));
        }
    }

    #[test]
    fn commands_are_rejected_while_processing() {
        let (next, actions) = SetupStateMachine::transition(
            SetupState::ProcessingJoinSpace { message: None },
            SetupEvent::StartNewSpace,
        );
        assert_eq!(next, SetupState::ProcessingJoinSpace { message: None });
        assert!(actions.is_empty());
    }

    #[test]
    fn channel_closed_surfaces_timeout_on_owning_node() {
        let (next, _) = SetupStateMachine::transition(
            SetupState::ProcessingCreateSpace { message: None },
            SetupEvent::ChannelClosed,
        );
        assert_eq!(
            next,
            SetupState::CreateSpaceInputPassphrase {
                error: Some(SetupError::NetworkTimeout)
            }
        );

        let (next, _) = SetupStateMachine::transition(
            SetupState::ProcessingJoinSpace { message: None },
            SetupEvent::ChannelClosed,
        );
        assert_eq!(
            next,
            SetupState::JoinSpaceInputPassphrase {
                error: Some(SetupError::NetworkTimeout)
            }
        );
    }

    #[test]
    fn channel_closed_outside_processing_is_ignored() {
        let (next, actions) =
            SetupStateMachine::transition(SetupState::Welcome, SetupEvent::ChannelClosed);
        assert_eq!(next, SetupState::Welcome);
        assert!(actions.is_empty());
    }
}
