use super::dispatcher::Dispatcher;
use super::events::{ServerEvent, SignalKind};
use crate::config::UnauthenticatedPolicy;

/// Where a gesture from a given connection is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureScope {
    /// The sender's first joined room.
    Room(String),
    /// Every other connected session, or every other authenticated one
    /// under [`UnauthenticatedPolicy::Reject`]. Legacy fallback for senders
    /// that have not joined a room.
    Broadcast,
}

impl GestureScope {
    pub fn room_id(&self) -> Option<&str> {
        match self {
            GestureScope::Room(room_id) => Some(room_id),
            GestureScope::Broadcast => None,
        }
    }
}

/// Forward a signaling payload to the other members of `payload.roomId`.
/// Returns the number of recipients, or `None` when the payload names no
/// room.
pub fn relay_signal(
    dispatcher: &Dispatcher,
    source: &str,
    kind: SignalKind,
    payload: serde_json::Value,
) -> Option<usize> {
    let room_id = payload.get("roomId")?.as_str()?.to_string();
    let text = ServerEvent::signal(kind, payload).to_text();
    Some(dispatcher.send_to_room(&room_id, Some(source), &text))
}

pub fn gesture_scope(dispatcher: &Dispatcher, source: &str) -> GestureScope {
    match dispatcher.first_room(source) {
        Some(room_id) => GestureScope::Room(room_id),
        None => GestureScope::Broadcast,
    }
}

/// Forward a gesture payload per [`gesture_scope`]. The sender never
/// receives its own gesture.
pub fn relay_gesture(
    dispatcher: &Dispatcher,
    source: &str,
    payload: serde_json::Value,
    policy: UnauthenticatedPolicy,
) -> (GestureScope, usize) {
    let scope = gesture_scope(dispatcher, source);
    let text = ServerEvent::Gesture(payload).to_text();
    let delivered = match (&scope, policy) {
        (GestureScope::Room(room_id), _) => dispatcher.send_to_room(room_id, Some(source), &text),
        (GestureScope::Broadcast, UnauthenticatedPolicy::Reject) => {
            dispatcher.send_to_authenticated(Some(source), &text)
        }
        (GestureScope::Broadcast, UnauthenticatedPolicy::Permissive) => {
            dispatcher.send_to_all(Some(source), &text)
        }
    };
    (scope, delivered)
}
