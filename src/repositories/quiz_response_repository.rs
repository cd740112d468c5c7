use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    db::LocalDatabase,
    errors::AppResult,
    models::domain::{QuestionResponse, QuizResponse},
    repositories::{parse_datetime, parse_uuid},
};

/// Local replicas of quiz attempts, keyed by response id with secondary
/// lookups by owning user and by synced flag. The answer list is stored as a
/// JSON column; the core never queries inside it.
#[async_trait]
pub trait QuizResponseStore: Send + Sync {
    async fn upsert(&self, response: &QuizResponse) -> AppResult<()>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizResponse>>;
    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<QuizResponse>>;
    async fn find_unsynced(&self) -> AppResult<Vec<QuizResponse>>;
    async fn mark_synced(&self, id: Uuid, synced: bool) -> AppResult<()>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

pub struct SqliteQuizResponseRepository {
    db: LocalDatabase,
}

impl SqliteQuizResponseRepository {
    pub fn new(db: &LocalDatabase) -> Self {
        Self { db: db.clone() }
    }

    fn from_row(row: &SqliteRow) -> AppResult<QuizResponse> {
        let responses: Vec<QuestionResponse> =
            serde_json::from_str(&row.try_get::<String, _>("responses")?)?;
        let completed_at = row
            .try_get::<Option<String>, _>("completed_at")?
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(QuizResponse {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            quiz_id: row.try_get("quiz_id")?,
            user_id: parse_uuid(&row.try_get::<String, _>("user_id")?)?,
            responses,
            progress: row.try_get::<i64, _>("progress")? as u8,
            started_at: parse_datetime(&row.try_get::<String, _>("started_at")?)?,
            completed_at,
            synced: row.try_get::<i64, _>("synced")? != 0,
            created_at: parse_datetime(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_datetime(&row.try_get::<String, _>("updated_at")?)?,
        })
    }
}

#[async_trait]
impl QuizResponseStore for SqliteQuizResponseRepository {
    async fn upsert(&self, response: &QuizResponse) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_responses
                (id, quiz_id, user_id, responses, progress, started_at, completed_at,
                 synced, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                responses = excluded.responses,
                progress = excluded.progress,
                completed_at = excluded.completed_at,
                synced = excluded.synced,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(response.id.to_string())
        .bind(&response.quiz_id)
        .bind(response.user_id.to_string())
        .bind(serde_json::to_string(&response.responses)?)
        .bind(response.progress as i64)
        .bind(response.started_at.to_rfc3339())
        .bind(response.completed_at.map(|dt| dt.to_rfc3339()))
        .bind(response.synced as i64)
        .bind(response.created_at.to_rfc3339())
        .bind(response.updated_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<QuizResponse>> {
        let row = sqlx::query("SELECT * FROM quiz_responses WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<QuizResponse>> {
        let rows = sqlx::query(
            "SELECT * FROM quiz_responses WHERE user_id = ?1 ORDER BY started_at",
        )
        .bind(user_id.to_string())
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn find_unsynced(&self) -> AppResult<Vec<QuizResponse>> {
        let rows = sqlx::query(
            "SELECT * FROM quiz_responses WHERE synced = 0 ORDER BY started_at",
        )
        .fetch_all(self.db.pool())
        .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn mark_synced(&self, id: Uuid, synced: bool) -> AppResult<()> {
        sqlx::query("UPDATE quiz_responses SET synced = ?1 WHERE id = ?2")
            .bind(synced as i64)
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM quiz_responses WHERE id = ?1")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM quiz_responses")
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
