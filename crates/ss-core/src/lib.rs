//! # ss-core
//!
//! Core domain models and business logic for the SyncSpace setup flow.
//!
//! This crate contains pure business logic without any infrastructure dependencies.

// Public module exports
pub mod events;
pub mod fence;
pub mod ids;
pub mod pairing;
pub mod ports;
pub mod security;
pub mod setup;

// Re-export commonly used types at the crate root
pub use fence::{FenceDecision, SeenEventKey, SessionFence};
pub use ids::{PeerId, SessionId};
pub use security::SecretString;
pub use setup::{SetupError, SetupState};
