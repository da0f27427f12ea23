use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    fence::SeenEventKey,
    ids::{PeerId, SessionId},
    setup::SetupState,
};

/// Notification topic names, as emitted by the negotiation backend.
pub mod topics {
    pub const SETUP_STATE_CHANGED: &str = "setup-state-changed";
    pub const PAIRING_REQUEST: &str = "pairing-request";
    pub const PAIRING_VERIFICATION: &str = "pairing-verification";

    pub const ALL: [&str; 3] = [SETUP_STATE_CHANGED, PAIRING_REQUEST, PAIRING_VERIFICATION];
}

/// Authoritative setup state pushed out-of-band.
///
/// The same transition may also arrive as a command's direct response; the
/// session fence makes the second arrival a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStateChanged {
    pub session_id: Option<SessionId>,
    pub state: SetupState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub ts: DateTime<Utc>,
}

/// Inbound pairing request from a peer device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingRequest {
    pub session_id: SessionId,
    pub peer_id: PeerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationKind {
    Request,
    Verification,
    Verifying,
    Complete,
    Failed,
}

impl VerificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationKind::Request => "request",
            VerificationKind::Verification => "verification",
            VerificationKind::Verifying => "verifying",
            VerificationKind::Complete => "complete",
            VerificationKind::Failed => "failed",
        }
    }
}

/// Progress of the PIN-verification sub-protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingVerification {
    pub kind: VerificationKind,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<PeerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decoded backend notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    SetupStateChanged(SetupStateChanged),
    PairingRequest(PairingRequest),
    PairingVerification(PairingVerification),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown notification topic: {0}")]
    UnknownTopic(String),
    #[error("malformed notification payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Notification {
    /// Decode a raw backend payload for the given topic.
    ///
    /// Backends have been observed to deliver either a JSON object or the
    /// same object serialized into a string; both shapes are accepted here so
    /// nothing downstream has to care.
    pub fn decode(topic: &str, payload: serde_json::Value) -> Result<Self, DecodeError> {
        let payload = match payload {
            serde_json::Value::String(raw) => serde_json::from_str(&raw)?,
            other => other,
        };

        match topic {
            topics::SETUP_STATE_CHANGED => Ok(Notification::SetupStateChanged(
                serde_json::from_value(payload)?,
            )),
            topics::PAIRING_REQUEST => {
                Ok(Notification::PairingRequest(serde_json::from_value(payload)?))
            }
            topics::PAIRING_VERIFICATION => Ok(Notification::PairingVerification(
                serde_json::from_value(payload)?,
            )),
            other => Err(DecodeError::UnknownTopic(other.to_string())),
        }
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Notification::SetupStateChanged(_) => topics::SETUP_STATE_CHANGED,
            Notification::PairingRequest(_) => topics::PAIRING_REQUEST,
            Notification::PairingVerification(_) => topics::PAIRING_VERIFICATION,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Notification::SetupStateChanged(n) => n.session_id.as_ref(),
            Notification::PairingRequest(n) => Some(&n.session_id),
            Notification::PairingVerification(n) => Some(&n.session_id),
        }
    }

    /// Whether this notification may legitimately open a session when none
    /// is active. Anything else arriving while the fence is idle is treated
    /// as a straggler.
    pub fn opens_session(&self) -> bool {
        match self {
            Notification::SetupStateChanged(_) => true,
            Notification::PairingRequest(_) => true,
            Notification::PairingVerification(n) => n.kind == VerificationKind::Request,
        }
    }

    /// Whether this notification ends the attempt it belongs to.
    pub fn is_terminal(&self) -> bool {
        match self {
            Notification::SetupStateChanged(n) => n.state.is_terminal(),
            Notification::PairingRequest(_) => false,
            Notification::PairingVerification(n) => matches!(
                n.kind,
                VerificationKind::Complete | VerificationKind::Failed
            ),
        }
    }

    /// Fence dedupe key: (session, discriminant, payload marker). `None` for
    /// notifications that carry no session id — those cannot be fenced.
    pub fn dedupe_key(&self) -> Option<SeenEventKey> {
        let session_id = self.session_id()?.clone();
        let (discriminant, marker) = match self {
            Notification::SetupStateChanged(n) => {
                (n.state.discriminant().to_string(), n.ts.to_rfc3339())
            }
            Notification::PairingRequest(n) => {
                ("pairing-request".to_string(), n.peer_id.to_string())
            }
            Notification::PairingVerification(n) => (
                format!("pairing-verification/{}", n.kind.as_str()),
                n.code
                    .clone()
                    .or_else(|| n.error.clone())
                    .unwrap_or_default(),
            ),
        };
        Some(SeenEventKey {
            session_id,
            discriminant,
            marker,
        })
    }
}
