use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    db::LocalDatabase,
    errors::AppResult,
    models::domain::User,
    repositories::{parse_datetime, parse_uuid},
};

/// Local replica of registered users, keyed by id with a unique secondary
/// index on the resume token.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert(&self, user: &User) -> AppResult<()>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn find_by_resume_token(&self, token: &str) -> AppResult<Option<User>>;
    async fn find_all(&self) -> AppResult<Vec<User>>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn clear(&self) -> AppResult<()>;
}

pub struct SqliteUserRepository {
    db: LocalDatabase,
}

impl SqliteUserRepository {
    pub fn new(db: &LocalDatabase) -> Self {
        Self { db: db.clone() }
    }

    fn from_row(row: &SqliteRow) -> AppResult<User> {
        Ok(User {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            resume_token: row.try_get("resume_token")?,
            created_at: parse_datetime(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_datetime(&row.try_get::<String, _>("updated_at")?)?,
        })
    }
}

#[async_trait]
impl UserStore for SqliteUserRepository {
    async fn upsert(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, resume_token, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                phone = excluded.phone,
                resume_token = excluded.resume_token,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.resume_token)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn find_by_resume_token(&self, token: &str) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE resume_token = ?1")
            .bind(token)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at")
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        sqlx::query("DELETE FROM users")
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
