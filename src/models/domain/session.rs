use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::quiz::{Question, Quiz};
use crate::models::domain::quiz_response::{Answer, QuestionResponse, QuizResponse};

/// In-memory state of the quiz currently being taken. Owned exclusively by
/// the session service; every mutation goes through these methods so the
/// derived progress can never drift from the answer set.
///
/// Serializable so the whole session can be snapshotted to the cache and
/// restored after a reload.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizSession {
    pub quiz: Option<Quiz>,
    /// Stable per attempt; the idempotency key for remote upserts.
    pub response_id: Uuid,
    pub current_question_index: usize,
    pub responses: Vec<QuestionResponse>,
    pub progress: u8,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// A remote record has been created (or a create has been queued) for
    /// this attempt; later pushes are updates.
    pub remote_created: bool,
    /// Progress level of the last push handed to the remote or the queue.
    pub last_pushed_progress: Option<u8>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizSession {
    pub fn new() -> Self {
        QuizSession {
            quiz: None,
            response_id: Uuid::new_v4(),
            current_question_index: 0,
            responses: Vec::new(),
            progress: 0,
            started_at: Utc::now(),
            completed_at: None,
            remote_created: false,
            last_pushed_progress: None,
        }
    }

    /// Reset to a fresh attempt at the given quiz. Issues a new response id,
    /// so a previous attempt's remote record is never overwritten.
    pub fn start(&mut self, quiz: Quiz) {
        *self = QuizSession::new();
        self.quiz = Some(quiz);
    }

    /// Upsert one answer by question id (replace, never append) and
    /// recompute progress from the full answer set.
    pub fn answer(&mut self, question_id: &str, answer: Answer) {
        self.responses.retain(|r| r.question_id != question_id);
        self.responses.push(QuestionResponse::new(question_id, answer));
        self.progress = self.compute_progress();
    }

    pub fn next_question(&mut self) {
        self.go_to_question(self.current_question_index.saturating_add(1));
    }

    pub fn previous_question(&mut self) {
        self.go_to_question(self.current_question_index.saturating_sub(1));
    }

    /// Clamp into `[0, total-1]`; never touches the answer set.
    pub fn go_to_question(&mut self, index: usize) {
        let max_index = self.total_questions().saturating_sub(1);
        self.current_question_index = index.min(max_index);
    }

    /// Mark the attempt complete. Precondition (caller-verified through
    /// `has_answered_all`): every required question answered.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
        self.progress = 100;
    }

    fn compute_progress(&self) -> u8 {
        let total = self.total_questions();
        if total == 0 {
            return 0;
        }
        ((self.answered_count() as f64 / total as f64) * 100.0).round() as u8
    }

    // Progress metrics.

    pub fn total_questions(&self) -> usize {
        self.quiz.as_ref().map(|q| q.total_questions()).unwrap_or(0)
    }

    /// Answers to questions the current quiz actually contains. A stray
    /// answer for an unknown id (e.g. restored from a stale snapshot) is kept
    /// in `responses` but never counts toward progress.
    pub fn answered_count(&self) -> usize {
        let Some(quiz) = &self.quiz else {
            return self.responses.len();
        };
        self.responses
            .iter()
            .filter(|r| quiz.questions.iter().any(|q| q.id == r.question_id))
            .count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.total_questions().saturating_sub(self.answered_count())
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz
            .as_ref()
            .and_then(|q| q.questions.get(self.current_question_index))
    }

    /// 1-based, for display.
    pub fn current_question_number(&self) -> usize {
        self.current_question_index + 1
    }

    pub fn is_first_question(&self) -> bool {
        self.current_question_index == 0
    }

    pub fn is_last_question(&self) -> bool {
        self.total_questions() > 0 && self.current_question_index == self.total_questions() - 1
    }

    pub fn can_go_back(&self) -> bool {
        !self.is_first_question()
    }

    pub fn can_go_forward(&self) -> bool {
        !self.is_last_question()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.responses
            .iter()
            .find(|r| r.question_id == question_id)
            .map(|r| &r.answer)
    }

    pub fn is_question_answered(&self, question_id: &str) -> bool {
        self.answer_for(question_id).is_some()
    }

    pub fn unanswered_question_ids(&self) -> Vec<String> {
        let Some(quiz) = &self.quiz else {
            return Vec::new();
        };
        quiz.questions
            .iter()
            .filter(|q| !self.is_question_answered(&q.id))
            .map(|q| q.id.clone())
            .collect()
    }

    pub fn has_answered_all(&self) -> bool {
        self.total_questions() > 0 && self.unanswered_question_ids().is_empty()
    }

    /// Remaining minutes, scaled from the quiz's estimate.
    pub fn estimated_time_remaining(&self) -> u32 {
        let Some(quiz) = &self.quiz else {
            return 0;
        };
        let total = quiz.total_questions();
        if total == 0 {
            return 0;
        }
        let per_question = quiz.estimated_time as f64 / total as f64;
        (per_question * self.unanswered_count() as f64).ceil() as u32
    }

    // Sync policy.

    /// Push to remote only when no remote record exists yet, progress has
    /// advanced at least `threshold` points since the last push, or the
    /// attempt is complete. The payload is always the full state, so a
    /// skipped push is carried by the next one.
    pub fn should_push(&self, threshold: u8) -> bool {
        if self.quiz.is_none() {
            return false;
        }
        if !self.remote_created {
            return true;
        }
        if self.is_complete() {
            return true;
        }
        match self.last_pushed_progress {
            None => true,
            Some(last) => self.progress.saturating_sub(last) >= threshold,
        }
    }

    /// Record that the current state was handed to the remote or the queue.
    pub fn mark_pushed(&mut self) {
        self.remote_created = true;
        self.last_pushed_progress = Some(self.progress);
    }

    /// Materialize the durable record for this attempt.
    pub fn to_record(&self, user_id: Uuid, synced: bool) -> Option<QuizResponse> {
        let quiz = self.quiz.as_ref()?;
        Some(QuizResponse {
            id: self.response_id,
            quiz_id: quiz.id.clone(),
            user_id,
            responses: self.responses.clone(),
            progress: self.progress,
            started_at: self.started_at,
            completed_at: self.completed_at,
            synced,
            created_at: self.started_at,
            updated_at: Utc::now(),
        })
    }
}
