use tokio::sync::mpsc;

use super::events::{self, close_code, AuthenticateData, ClientEvent, JoinRoomData, ServerEvent, SignalKind};
use super::dispatcher::JoinOutcome;
use super::relay;
use super::session::GatewaySession;
use crate::config::UnauthenticatedPolicy;
use crate::persistence::{spawn_persist, GestureRecord, RetryPolicy};
use crate::state::AppState;

/// What the socket loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Flush queued frames, then close with this code.
    Close { code: u16, reason: &'static str },
}

/// Lifecycle of one connection: `Connected` -> `Authenticated` -> closed.
/// Registered with the dispatcher on open; dropping it removes the session
/// and its room memberships.
pub struct Connection {
    state: AppState,
    connection_id: String,
    tx: mpsc::UnboundedSender<String>,
    authenticated: bool,
    closed: bool,
}

impl Connection {
    pub fn open(state: AppState) -> (Self, mpsc::UnboundedReceiver<String>) {
        let connection_id = crate::snowflake::generate();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        state
            .dispatcher
            .register_session(GatewaySession::new(connection_id.clone(), tx.clone()));
        tracing::info!(connection_id = %connection_id, "connection opened");

        (
            Self {
                state,
                connection_id,
                tx,
                authenticated: false,
                closed: false,
            },
            rx,
        )
    }

    pub fn id(&self) -> &str {
        &self.connection_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Decode and handle one text frame. Undecodable frames are ignored,
    /// except an `authenticate`, which fails verification.
    pub fn handle_text(&mut self, text: &str) -> Flow {
        match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => self.handle_event(event),
            // An undecodable authenticate still gets an answer.
            Err(e) if events::event_type(text).as_deref() == Some("authenticate") => {
                tracing::debug!(connection_id = %self.connection_id, "malformed authenticate: {e}");
                if self.closed {
                    return Flow::Continue;
                }
                self.authenticate(AuthenticateData::default())
            }
            Err(e) => {
                tracing::debug!(connection_id = %self.connection_id, "ignoring frame: {e}");
                Flow::Continue
            }
        }
    }

    pub fn handle_event(&mut self, event: ClientEvent) -> Flow {
        if self.closed {
            return Flow::Continue;
        }

        if let ClientEvent::Authenticate(data) = event {
            return self.authenticate(data);
        }

        if !self.authenticated
            && self.state.config.unauthenticated == UnauthenticatedPolicy::Reject
        {
            tracing::warn!(
                connection_id = %self.connection_id,
                event = event.name(),
                "dropping event from unauthenticated connection"
            );
            return Flow::Continue;
        }

        match event {
            ClientEvent::Authenticate(_) => {}
            ClientEvent::JoinRoom(data) => self.join_room(data),
            ClientEvent::Offer(payload) => self.signal(SignalKind::Offer, payload),
            ClientEvent::Answer(payload) => self.signal(SignalKind::Answer, payload),
            ClientEvent::IceCandidate(payload) => self.signal(SignalKind::IceCandidate, payload),
            ClientEvent::Gesture(payload) => self.gesture(payload),
        }
        Flow::Continue
    }

    fn authenticate(&mut self, data: AuthenticateData) -> Flow {
        if self.authenticated {
            tracing::warn!(connection_id = %self.connection_id, "ignoring repeated authenticate");
            return Flow::Continue;
        }

        let now = chrono::Utc::now().timestamp();
        let result = crate::auth::authenticate(
            &data.init_data,
            &self.state.config.bot_token,
            now,
            self.state.config.auth_max_age_secs,
        );

        match result {
            Ok(user) => {
                let user_id = user.id.clone();
                if !self.state.dispatcher.bind_user(&self.connection_id, user) {
                    return Flow::Continue;
                }
                self.authenticated = true;
                tracing::info!(connection_id = %self.connection_id, user_id = %user_id, "authenticated");
                self.send(ServerEvent::AuthSuccess { user_id });
                Flow::Continue
            }
            Err(e) => {
                tracing::info!(connection_id = %self.connection_id, reason = e.reason(), "authentication failed: {e}");
                self.send(ServerEvent::AuthFailed { message: e.reason() });
                Flow::Close {
                    code: close_code::AUTH_FAILED,
                    reason: e.reason(),
                }
            }
        }
    }

    fn join_room(&mut self, data: JoinRoomData) {
        let user_id = self
            .state
            .dispatcher
            .user(&self.connection_id)
            .map(|user| user.id)
            .or(data.user_id)
            .unwrap_or(serde_json::Value::Null);

        match self
            .state
            .dispatcher
            .join_room(&self.connection_id, &data.room_id, user_id.clone())
        {
            JoinOutcome::Joined { notified } => tracing::info!(
                connection_id = %self.connection_id,
                user_id = %user_id,
                room_id = %data.room_id,
                notified,
                "joined room"
            ),
            JoinOutcome::AlreadyMember => tracing::debug!(
                connection_id = %self.connection_id,
                room_id = %data.room_id,
                "already in room"
            ),
            JoinOutcome::UnknownConnection => tracing::warn!(
                connection_id = %self.connection_id,
                "join from unregistered connection"
            ),
        }
    }

    fn signal(&self, kind: SignalKind, payload: serde_json::Value) {
        match relay::relay_signal(&self.state.dispatcher, &self.connection_id, kind, payload) {
            Some(delivered) => tracing::debug!(
                connection_id = %self.connection_id,
                event = kind.event_name(),
                delivered,
                "relayed signal"
            ),
            None => tracing::warn!(
                connection_id = %self.connection_id,
                event = kind.event_name(),
                "signal without roomId dropped"
            ),
        }
    }

    fn gesture(&self, payload: serde_json::Value) {
        let user_id = self
            .state
            .dispatcher
            .user(&self.connection_id)
            .map(|user| user.id_string());

        let (scope, delivered) = relay::relay_gesture(
            &self.state.dispatcher,
            &self.connection_id,
            payload.clone(),
            self.state.config.unauthenticated,
        );
        tracing::debug!(
            connection_id = %self.connection_id,
            room_id = scope.room_id().unwrap_or("*"),
            delivered,
            "relayed gesture"
        );

        let record = GestureRecord::new(
            &self.connection_id,
            user_id,
            scope.room_id().map(str::to_string),
            payload,
        );
        let tx = self.tx.clone();
        spawn_persist(
            self.state.store.clone(),
            RetryPolicy::from(self.state.config.as_ref()),
            record,
            move |e| {
                // The connection may be gone by now.
                let _ = tx.send(ServerEvent::GestureSaveError { error: e.to_string() }.to_text());
            },
        );
    }

    fn send(&self, event: ServerEvent) {
        let _ = self.tx.send(event.to_text());
    }

    /// Tear down: leave every room and drop the session. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(session) = self.state.dispatcher.remove_session(&self.connection_id) {
            let duration = chrono::Utc::now() - session.connected_at;
            tracing::info!(
                connection_id = %self.connection_id,
                rooms = session.rooms.len(),
                connected_secs = duration.num_seconds(),
                "connection closed"
            );
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
