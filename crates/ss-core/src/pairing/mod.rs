//! Pairing domain module.
//!
//! Models one PIN-verification attempt between two devices. The wire-level
//! pairing protocol lives in the negotiation backend; this module only
//! tracks the locally observable attempt.

pub mod attempt;

pub use attempt::{PairingAttempt, PairingPhase};
