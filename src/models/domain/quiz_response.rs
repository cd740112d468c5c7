use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of a single answered question. Untagged so the wire format stays
/// the plain JSON scalar/array the remote store expects.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Answer {
    Bool(bool),
    Number(f64),
    Text(String),
    Selections(Vec<String>),
}

/// One answered question. Keyed uniquely by `question_id` within an attempt;
/// re-answering replaces, never appends.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionResponse {
    pub question_id: String,
    pub answer: Answer,
    pub answered_at: DateTime<Utc>,
}

impl QuestionResponse {
    pub fn new(question_id: &str, answer: Answer) -> Self {
        QuestionResponse {
            question_id: question_id.to_string(),
            answer,
            answered_at: Utc::now(),
        }
    }
}

/// The durable replica of one quiz attempt. The in-memory session owns the
/// live state; this record is what local and remote stores hold, reconciled
/// by id with remote as the eventually-consistent follower.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizResponse {
    pub id: Uuid,
    pub quiz_id: String,
    pub user_id: Uuid,
    pub responses: Vec<QuestionResponse>,
    /// 0-100, always recomputed from the answer set.
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Has the remote store acknowledged this state at least once at its
    /// current progress level.
    pub synced: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizResponse {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}
