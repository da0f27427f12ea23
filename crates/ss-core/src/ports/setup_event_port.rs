use crate::{ids::SessionId, setup::SetupState};

/// Presentation-side sink for setup state changes.
#[async_trait::async_trait]
pub trait SetupEventPort: Send + Sync {
    async fn emit_setup_state_changed(&self, state: SetupState, session_id: Option<SessionId>);
}
