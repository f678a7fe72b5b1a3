#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use gesture_relay::auth::{sign, InitData, AUTH_DATE_FIELD, HASH_FIELD, USER_FIELD};
use gesture_relay::config::{RelayConfig, UnauthenticatedPolicy};
use gesture_relay::error::StoreError;
use gesture_relay::persistence::{GestureRecord, GestureStore, MemoryGestureStore};
use gesture_relay::routes;
use gesture_relay::state::AppState;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const BOT_TOKEN: &str = "7000000000:AAH-integration-token";

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gesture store that replays scripted outcomes, then succeeds and keeps
/// the records.
#[derive(Default)]
pub struct ScriptedStore {
    outcomes: Mutex<VecDeque<Result<(), StoreError>>>,
    attempts: AtomicU32,
    saved: MemoryGestureStore,
}

impl ScriptedStore {
    pub fn new(outcomes: Vec<Result<(), StoreError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn saved(&self) -> Vec<GestureRecord> {
        self.saved.records()
    }
}

#[async_trait]
impl GestureStore for ScriptedStore {
    async fn insert(&self, record: &GestureRecord) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Err(e)) => Err(e),
            _ => self.saved.insert(record).await,
        }
    }
}

/// Test server with its own dispatcher and store. Each instance is
/// isolated, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
    pub store: Arc<ScriptedStore>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::with_store(UnauthenticatedPolicy::Reject, ScriptedStore::default())
    }

    pub fn with_store(policy: UnauthenticatedPolicy, store: ScriptedStore) -> Self {
        let store = Arc::new(store);
        let config = RelayConfig {
            bot_token: BOT_TOKEN.to_string(),
            auth_max_age_secs: 86_400,
            unauthenticated: policy,
            save_max_attempts: 3,
            save_backoff: Duration::from_millis(10),
        };
        let static_dir = std::env::temp_dir().join("gesture-relay-test-static");
        let state = AppState::new(config, store.clone(), static_dir);
        Self { state, store }
    }

    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns the
    /// WebSocket URL.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("ws://127.0.0.1:{}/ws", addr.port())
    }
}

/// `initData` signed with [`BOT_TOKEN`].
pub fn signed_init_data(user_json: &str, auth_date: i64) -> String {
    let mut init = InitData::default();
    init.insert("query_id", "AAHdF6IQAAAAAN0XohDhrOrc");
    init.insert(USER_FIELD, user_json);
    init.insert(AUTH_DATE_FIELD, auth_date.to_string());
    let hash = sign(&init, BOT_TOKEN);
    init.insert(HASH_FIELD, hash);
    init.to_query()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub async fn send_event(ws: &mut Client, event_type: &str, data: serde_json::Value) {
    let frame = serde_json::json!({ "type": event_type, "data": data });
    ws.send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Next JSON event, skipping control frames. Panics after two seconds.
pub async fn recv_event(ws: &mut Client) -> serde_json::Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<serde_json::Value>(&text).unwrap()
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                other => panic!("expected text frame, got {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Asserts that no text frame arrives within a short window.
pub async fn assert_silent(ws: &mut Client) {
    let result = tokio::time::timeout(Duration::from_millis(200), ws.next()).await;
    if let Ok(Some(Ok(msg))) = result {
        panic!("expected no event, got {msg:?}");
    }
}

pub async fn connect(url: &str) -> Client {
    let (ws, _) = connect_async(url).await.unwrap();
    ws
}

/// Connect and authenticate as `user_id`; consumes `auth-success`.
pub async fn connect_as(url: &str, user_id: i64) -> Client {
    let mut ws = connect(url).await;
    let init_data = signed_init_data(&format!(r#"{{"id":{user_id},"first_name":"User{user_id}"}}"#), now());
    send_event(&mut ws, "authenticate", serde_json::json!({ "initData": init_data })).await;
    let reply = recv_event(&mut ws).await;
    assert_eq!(reply["type"], "auth-success", "unexpected reply {reply}");
    assert_eq!(reply["data"]["userId"], user_id);
    ws
}

/// Send `join-room` and give the server a moment to apply it. Joining an
/// empty room produces no reply, so there is nothing to wait on.
pub async fn join(ws: &mut Client, room_id: &str) {
    send_event(ws, "join-room", serde_json::json!({ "roomId": room_id })).await;
    settle().await;
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
