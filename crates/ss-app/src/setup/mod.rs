//! Setup flow orchestration.

pub mod context;
pub mod controller;

pub use context::SetupContext;
pub use controller::SetupController;
