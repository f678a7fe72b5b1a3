use serde::{Deserialize, Serialize};

/// Event sent by a client. Envelope: `{"type": <event>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    Authenticate(AuthenticateData),
    JoinRoom(JoinRoomData),
    Offer(serde_json::Value),
    Answer(serde_json::Value),
    IceCandidate(serde_json::Value),
    Gesture(serde_json::Value),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::Offer(_) => SignalKind::Offer.event_name(),
            ClientEvent::Answer(_) => SignalKind::Answer.event_name(),
            ClientEvent::IceCandidate(_) => SignalKind::IceCandidate.event_name(),
            ClientEvent::Gesture(_) => "gesture",
        }
    }
}

/// `authenticate` payload. A missing `initData` decodes as empty and fails
/// signature verification.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthenticateData {
    #[serde(rename = "initData", default)]
    pub init_data: String,
}

/// Event name of a frame that failed to decode, if it carries one.
pub fn event_type(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value.get("type")?.as_str().map(str::to_string)
}

/// `join-room` payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinRoomData {
    #[serde(rename = "roomId")]
    pub room_id: String,
    /// Self-reported by the client; only used when the connection has no
    /// authenticated identity.
    #[serde(rename = "userId", default)]
    pub user_id: Option<serde_json::Value>,
}

/// Connection-negotiation messages relayed verbatim within a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::IceCandidate => "ice-candidate",
        }
    }
}

/// Event sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    AuthSuccess {
        #[serde(rename = "userId")]
        user_id: serde_json::Value,
    },
    AuthFailed {
        message: &'static str,
    },
    UserJoined {
        #[serde(rename = "userId")]
        user_id: serde_json::Value,
        #[serde(rename = "socketId")]
        socket_id: String,
    },
    Offer(serde_json::Value),
    Answer(serde_json::Value),
    IceCandidate(serde_json::Value),
    Gesture(serde_json::Value),
    GestureSaveError {
        error: String,
    },
}

impl ServerEvent {
    pub fn signal(kind: SignalKind, payload: serde_json::Value) -> Self {
        match kind {
            SignalKind::Offer => ServerEvent::Offer(payload),
            SignalKind::Answer => ServerEvent::Answer(payload),
            SignalKind::IceCandidate => ServerEvent::IceCandidate(payload),
        }
    }

    /// Serialized frame text.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Close codes.
pub mod close_code {
    pub const AUTH_FAILED: u16 = 4004;
}
