//! Backend notification types.
//!
//! Raw payloads pushed by the negotiation backend are decoded exactly once,
//! at the channel boundary, into the typed unions defined here. The rest of
//! the core never re-inspects raw payload shape.

pub mod notification;

pub use notification::{
    topics, DecodeError, Notification, PairingRequest, PairingVerification, SetupStateChanged,
    VerificationKind,
};
