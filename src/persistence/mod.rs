pub mod memory;
pub mod retry;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub use memory::MemoryGestureStore;
pub use retry::{persist_with_retry, spawn_persist, RetryPolicy};
pub use sqlite::SqliteGestureStore;

/// Durable copy of one gesture event plus the metadata recorded on receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureRecord {
    pub id: String,
    pub connection_id: String,
    pub user_id: Option<String>,
    pub room_id: Option<String>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl GestureRecord {
    pub fn new(
        connection_id: &str,
        user_id: Option<String>,
        room_id: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: crate::snowflake::generate(),
            connection_id: connection_id.to_string(),
            user_id,
            room_id,
            payload,
            received_at: Utc::now(),
        }
    }
}

/// Durable store accepting gesture records.
#[async_trait]
pub trait GestureStore: Send + Sync {
    async fn insert(&self, record: &GestureRecord) -> Result<(), StoreError>;
}
