//! The CRUD contract against the remote data store. Consumed, not owned:
//! the application supplies an implementation (HTTP client, test fake) and
//! the sync core treats every failure as transient.
//!
//! `create_user` and `create_quiz_response` must be safe to call twice with
//! the same id (upsert semantics downstream) - the delivery model is
//! at-least-once.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::domain::{Quiz, QuizResponse, User};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn create_user(&self, user: &User) -> AppResult<User>;
    async fn get_user_by_resume_token(&self, token: &str) -> AppResult<Option<User>>;
    async fn create_quiz_response(&self, response: &QuizResponse) -> AppResult<QuizResponse>;
    async fn update_quiz_response(
        &self,
        id: Uuid,
        response: &QuizResponse,
    ) -> AppResult<QuizResponse>;
    async fn get_quiz_responses_by_user(&self, user_id: Uuid) -> AppResult<Vec<QuizResponse>>;
    async fn get_quiz(&self, id: &str) -> AppResult<Option<Quiz>>;
}
