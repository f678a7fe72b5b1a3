use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use super::{GestureRecord, GestureStore};
use crate::error::StoreError;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// Gesture store backed by the `gestures` table.
#[derive(Clone)]
pub struct SqliteGestureStore {
    pool: SqlitePool,
}

impl SqliteGestureStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the pool and run migrations. The server refuses to start when
    /// this fails.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Ok(Self::new(create_pool(database_url).await?))
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gestures")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get(&self, id: &str) -> Result<Option<GestureRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT id, connection_id, user_id, room_id, payload, received_at FROM gestures WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get("payload");
        let received_at: String = row.get("received_at");
        Ok(Some(GestureRecord {
            id: row.get("id"),
            connection_id: row.get("connection_id"),
            user_id: row.get("user_id"),
            room_id: row.get("room_id"),
            payload: serde_json::from_str(&payload)
                .map_err(|e| StoreError::new(format!("corrupt gesture payload: {e}")))?,
            received_at: chrono::DateTime::parse_from_rfc3339(&received_at)
                .map_err(|e| StoreError::new(format!("corrupt gesture timestamp: {e}")))?
                .with_timezone(&chrono::Utc),
        }))
    }
}

#[async_trait]
impl GestureStore for SqliteGestureStore {
    async fn insert(&self, record: &GestureRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO gestures (id, connection_id, user_id, room_id, payload, received_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(&record.connection_id)
        .bind(&record.user_id)
        .bind(&record.room_id)
        .bind(record.payload.to_string())
        .bind(record.received_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteGestureStore {
        SqliteGestureStore::connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory store")
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let store = store().await;
        let record = GestureRecord::new(
            "conn-1",
            Some("42".to_string()),
            Some("lobby".to_string()),
            serde_json::json!({ "kind": "swipe", "dx": 12.5 }),
        );

        store.insert(&record).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.connection_id, "conn-1");
        assert_eq!(stored.user_id.as_deref(), Some("42"));
        assert_eq!(stored.room_id.as_deref(), Some("lobby"));
        assert_eq!(stored.payload, record.payload);
        assert_eq!(stored.received_at, record.received_at);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_permanent_failure() {
        let store = store().await;
        let record = GestureRecord::new("conn-1", None, None, serde_json::json!({}));
        store.insert(&record).await.unwrap();

        let err = store.insert(&record).await.unwrap_err();
        assert!(!err.is_transient(), "unexpected transient error: {err}");
    }

    #[tokio::test]
    async fn test_missing_record() {
        let store = store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }
}
