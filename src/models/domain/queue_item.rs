use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::quiz_response::QuizResponse;
use crate::models::domain::user::User;

/// Retry ceiling for a queued write. Items that reach it stop being retried
/// automatically but are never deleted; losing them would lose user data.
pub const MAX_SYNC_RETRIES: u32 = 5;

/// The remote mutation a queue item will replay. Always a full-state
/// payload: remote upserts are idempotent by id, so replaying a superset is
/// harmless.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum QueuePayload {
    UserCreate(User),
    ResponseUpsert(QuizResponse),
}

impl QueuePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            QueuePayload::UserCreate(_) => "user-create",
            QueuePayload::ResponseUpsert(_) => "response-upsert",
        }
    }
}

/// One not-yet-acknowledged remote mutation, durable in the local store.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct OfflineQueueItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: QueuePayload,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
    pub acknowledged: bool,
}

impl OfflineQueueItem {
    pub fn new(payload: QueuePayload) -> Self {
        OfflineQueueItem {
            id: Uuid::new_v4(),
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
            acknowledged: false,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Retries exhausted; the item stays queryable for diagnostics.
    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= MAX_SYNC_RETRIES
    }

    /// Saturating increment; `retry_count` never exceeds the ceiling.
    pub fn record_failure(&mut self) {
        self.retry_count = (self.retry_count + 1).min(MAX_SYNC_RETRIES);
    }
}
