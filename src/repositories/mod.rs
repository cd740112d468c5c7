pub mod offline_queue_repository;
pub mod quiz_response_repository;
pub mod user_repository;

pub use offline_queue_repository::{OfflineQueueStore, SqliteOfflineQueueRepository};
pub use quiz_response_repository::{QuizResponseStore, SqliteQuizResponseRepository};
pub use user_repository::{SqliteUserRepository, UserStore};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

pub(crate) fn parse_datetime(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::StorageError(format!("bad timestamp '{}': {}", raw, err)))
}

pub(crate) fn parse_uuid(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|err| AppError::StorageError(format!("bad uuid '{}': {}", raw, err)))
}
