use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    db::LocalDatabase,
    errors::AppResult,
    models::domain::{OfflineQueueItem, QueuePayload},
    repositories::{parse_datetime, parse_uuid},
};

/// Durable backing for the pending-write queue. FIFO order comes from the
/// enqueued_at index; the payload column holds the typed mutation as JSON.
#[async_trait]
pub trait OfflineQueueStore: Send + Sync {
    async fn upsert(&self, item: &OfflineQueueItem) -> AppResult<()>;
    async fn find_all(&self) -> AppResult<Vec<OfflineQueueItem>>;
    async fn find_unacknowledged(&self) -> AppResult<Vec<OfflineQueueItem>>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

pub struct SqliteOfflineQueueRepository {
    db: LocalDatabase,
}

impl SqliteOfflineQueueRepository {
    pub fn new(db: &LocalDatabase) -> Self {
        Self { db: db.clone() }
    }

    fn from_row(row: &SqliteRow) -> AppResult<OfflineQueueItem> {
        let payload: QueuePayload = serde_json::from_str(&row.try_get::<String, _>("payload")?)?;
        Ok(OfflineQueueItem {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            payload,
            enqueued_at: parse_datetime(&row.try_get::<String, _>("enqueued_at")?)?,
            retry_count: row.try_get::<i64, _>("retry_count")? as u32,
            acknowledged: row.try_get::<i64, _>("acknowledged")? != 0,
        })
    }
}

#[async_trait]
impl OfflineQueueStore for SqliteOfflineQueueRepository {
    async fn upsert(&self, item: &OfflineQueueItem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO offline_queue (id, kind, payload, enqueued_at, retry_count, acknowledged)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                payload = excluded.payload,
                retry_count = excluded.retry_count,
                acknowledged = excluded.acknowledged
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.kind())
        .bind(serde_json::to_string(&item.payload)?)
        .bind(item.enqueued_at.to_rfc3339())
        .bind(item.retry_count as i64)
        .bind(item.acknowledged as i64)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn find_all(&self) -> AppResult<Vec<OfflineQueueItem>> {
        let rows = sqlx::query("SELECT * FROM offline_queue ORDER BY enqueued_at, id")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn find_unacknowledged(&self) -> AppResult<Vec<OfflineQueueItem>> {
        let rows = sqlx::query(
            "SELECT * FROM offline_queue WHERE acknowledged = 0 ORDER BY enqueued_at, id",
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM offline_queue WHERE id = ?1")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM offline_queue")
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
