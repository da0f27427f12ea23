//! PIN-verification pairing orchestration.

pub mod config;
pub mod controller;
pub mod events;

pub use config::PairingConfig;
pub use controller::PairingController;
pub use events::{PairingEventPort, PairingUiEvent};
