use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::events::ServerEvent;
use super::rooms::RoomRegistry;
use super::session::GatewaySession;
use crate::auth::AuthenticatedUser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Newly joined; `notified` peers received `user-joined`.
    Joined { notified: usize },
    AlreadyMember,
    UnknownConnection,
}

/// Owns every live session and the room registry. All membership and
/// identity changes go through here.
///
/// Lock discipline: a sessions guard and a rooms guard are never held at
/// the same time.
#[derive(Default)]
pub struct Dispatcher {
    sessions: DashMap<String, GatewaySession>,
    rooms: RoomRegistry,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn register_session(&self, session: GatewaySession) {
        self.sessions
            .insert(session.connection_id.clone(), session);
    }

    /// Drop the session and its room memberships. Safe to call repeatedly.
    pub fn remove_session(&self, connection_id: &str) -> Option<GatewaySession> {
        let (_, session) = self.sessions.remove(connection_id)?;
        for room_id in &session.rooms {
            self.rooms.leave(room_id, connection_id);
        }
        Some(session)
    }

    pub fn is_connected(&self, connection_id: &str) -> bool {
        self.sessions.contains_key(connection_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn oldest_connected_at(&self) -> Option<DateTime<Utc>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().connected_at)
            .min()
    }

    /// Bind an identity. Fails if the connection is gone or already bound.
    pub fn bind_user(&self, connection_id: &str, user: AuthenticatedUser) -> bool {
        match self.sessions.get_mut(connection_id) {
            Some(mut session) if session.user.is_none() => {
                session.user = Some(user);
                true
            }
            _ => false,
        }
    }

    pub fn user(&self, connection_id: &str) -> Option<AuthenticatedUser> {
        self.sessions
            .get(connection_id)
            .and_then(|session| session.user.clone())
    }

    pub fn rooms_of(&self, connection_id: &str) -> Vec<String> {
        self.sessions
            .get(connection_id)
            .map(|session| session.rooms.clone())
            .unwrap_or_default()
    }

    /// The earliest joined room still held by the connection.
    pub fn first_room(&self, connection_id: &str) -> Option<String> {
        self.sessions
            .get(connection_id)
            .and_then(|session| session.rooms.first().cloned())
    }

    /// Add the connection to `room_id` and announce it to the existing
    /// members as `user_id`.
    pub fn join_room(
        &self,
        connection_id: &str,
        room_id: &str,
        user_id: serde_json::Value,
    ) -> JoinOutcome {
        if !self.is_connected(connection_id) {
            return JoinOutcome::UnknownConnection;
        }
        if !self.rooms.join(room_id, connection_id) {
            return JoinOutcome::AlreadyMember;
        }

        let recorded = match self.sessions.get_mut(connection_id) {
            Some(mut session) => {
                session.rooms.push(room_id.to_string());
                true
            }
            None => false,
        };
        if !recorded {
            // Disconnected in between; undo.
            self.rooms.leave(room_id, connection_id);
            return JoinOutcome::UnknownConnection;
        }

        let announcement = ServerEvent::UserJoined {
            user_id,
            socket_id: connection_id.to_string(),
        };
        let notified = self.send_to_room(room_id, Some(connection_id), &announcement.to_text());
        JoinOutcome::Joined { notified }
    }

    /// Queue `text` for one connection. Returns `false` if it is gone.
    pub fn send_to(&self, connection_id: &str, text: &str) -> bool {
        self.sessions
            .get(connection_id)
            .is_some_and(|session| session.tx.send(text.to_string()).is_ok())
    }

    /// Queue `text` for every member of `room_id` except `except`.
    pub fn send_to_room(&self, room_id: &str, except: Option<&str>, text: &str) -> usize {
        self.rooms
            .members(room_id)
            .iter()
            .filter(|member| Some(member.as_str()) != except)
            .filter(|member| self.send_to(member, text))
            .count()
    }

    /// Queue `text` for every connected session except `except`.
    pub fn send_to_all(&self, except: Option<&str>, text: &str) -> usize {
        self.sessions
            .iter()
            .filter(|entry| Some(entry.key().as_str()) != except)
            .filter(|entry| entry.value().tx.send(text.to_string()).is_ok())
            .count()
    }

    /// Like [`Dispatcher::send_to_all`], restricted to sessions with a bound
    /// user.
    pub fn send_to_authenticated(&self, except: Option<&str>, text: &str) -> usize {
        self.sessions
            .iter()
            .filter(|entry| Some(entry.key().as_str()) != except)
            .filter(|entry| entry.value().user.is_some())
            .filter(|entry| entry.value().tx.send(text.to_string()).is_ok())
            .count()
    }
}
