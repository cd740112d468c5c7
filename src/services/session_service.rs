//! Drives the quiz attempt currently on screen.
//!
//! Mutators are synchronous: they update the in-memory session and the cache
//! snapshot immediately, then hand persistence and remote delivery to a
//! background task. Only `submit_quiz` surfaces a remote failure to the
//! caller; every other path degrades to queued delivery.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{info, warn};
use uuid::Uuid;

use crate::cache::{keys, KvCache};
use crate::connectivity::ConnectivityMonitor;
use crate::errors::{AppError, AppResult};
use crate::models::domain::{Answer, Question, QueuePayload, Quiz, QuizResponse, QuizSession, User};
use crate::remote::RemoteStore;
use crate::repositories::QuizResponseStore;
use crate::services::offline_queue_service::OfflineQueueService;

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionService {
    session: Arc<Mutex<QuizSession>>,
    user: Arc<Mutex<Option<User>>>,
    cache: Arc<KvCache>,
    responses: Option<Arc<dyn QuizResponseStore>>,
    queue: OfflineQueueService,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<ConnectivityMonitor>,
    /// Minimum progress delta, in points, between interim remote pushes.
    push_threshold: u8,
}

impl SessionService {
    pub fn new(
        cache: Arc<KvCache>,
        responses: Option<Arc<dyn QuizResponseStore>>,
        queue: OfflineQueueService,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
        push_threshold: u8,
    ) -> Self {
        SessionService {
            session: Arc::new(Mutex::new(QuizSession::new())),
            user: Arc::new(Mutex::new(None)),
            cache,
            responses,
            queue,
            remote,
            connectivity,
            push_threshold,
        }
    }

    /// Begin a fresh attempt at `quiz`. Persists the initial state locally
    /// and pushes (or queues) the remote record; remote trouble never fails
    /// the start.
    pub async fn start_quiz(&self, quiz: Quiz) -> AppResult<()> {
        if quiz.questions.is_empty() {
            return Err(AppError::ValidationError(
                "quiz has no questions".to_string(),
            ));
        }
        info!("starting quiz {}", quiz.id);
        {
            let mut session = self.lock_session();
            session.start(quiz);
            self.cache.set(keys::QUIZ_SESSION, &*session);
        }
        self.save_progress().await;
        Ok(())
    }

    /// Record an answer. Returns immediately; durable and remote writes run
    /// in the background.
    pub fn answer_question(&self, question_id: &str, answer: Answer) {
        {
            let mut session = self.lock_session();
            session.answer(question_id, answer);
            self.cache.set(keys::QUIZ_SESSION, &*session);
        }
        self.schedule_save();
    }

    pub fn next_question(&self) {
        let mut session = self.lock_session();
        session.next_question();
        self.cache.set(keys::QUIZ_SESSION, &*session);
    }

    pub fn previous_question(&self) {
        let mut session = self.lock_session();
        session.previous_question();
        self.cache.set(keys::QUIZ_SESSION, &*session);
    }

    pub fn go_to_question(&self, index: usize) {
        let mut session = self.lock_session();
        session.go_to_question(index);
        self.cache.set(keys::QUIZ_SESSION, &*session);
    }

    /// Flush the current session: cache snapshot, durable upsert, and a
    /// throttled remote push. Local failures degrade with a warning; remote
    /// failures become queued writes.
    pub async fn save_progress(&self) {
        let (snapshot, user_id) = {
            let session = self.lock_session();
            (session.clone(), self.lock_user().as_ref().map(|u| u.id))
        };
        self.cache.set(keys::QUIZ_SESSION, &snapshot);

        // Without a registered user there is nothing to attribute the
        // attempt to yet; the cache snapshot carries it until registration.
        let Some(user_id) = user_id else { return };
        let Some(record) = snapshot.to_record(user_id, false) else {
            return;
        };

        if let Some(store) = &self.responses {
            if let Err(err) = store.upsert(&record).await {
                warn!("could not persist response {} locally: {}", record.id, err);
            }
        }

        if snapshot.should_push(self.push_threshold) {
            self.push(&record, snapshot.remote_created).await;
            let mut session = self.lock_session();
            // Guard against a reset or restart that happened mid-await.
            if session.response_id == record.id {
                session.mark_pushed();
                self.cache.set(keys::QUIZ_SESSION, &*session);
            }
        }
    }

    /// Deliver one full-state record to the remote, queueing it on failure
    /// or while offline. Delivery is guaranteed either way.
    async fn push(&self, record: &QuizResponse, update: bool) {
        if self.connectivity.is_online() {
            let result = if update {
                self.remote.update_quiz_response(record.id, record).await
            } else {
                self.remote.create_quiz_response(record).await
            };
            match result {
                Ok(_) => {
                    self.mark_synced_locally(record.id).await;
                    return;
                }
                Err(err) => warn!("remote push for {} failed, queueing: {}", record.id, err),
            }
        }
        self.queue
            .enqueue(QueuePayload::ResponseUpsert(record.clone()))
            .await;
    }

    async fn mark_synced_locally(&self, id: Uuid) {
        if let Some(store) = &self.responses {
            if let Err(err) = store.mark_synced(id, true).await {
                warn!("could not mark response {} synced: {}", id, err);
            }
        }
    }

    /// Restore the session snapshot left by a previous run, if any.
    pub fn load_progress(&self) -> bool {
        match self.cache.get::<QuizSession>(keys::QUIZ_SESSION) {
            Some(snapshot) => {
                info!(
                    "restored quiz session at question {} ({}% complete)",
                    snapshot.current_question_number(),
                    snapshot.progress
                );
                *self.lock_session() = snapshot;
                true
            }
            None => false,
        }
    }

    /// Finalize the attempt. This is the one path that reports remote
    /// failure to the caller; even then the submission is already durable
    /// and queued, so retrying is never required for safety.
    pub async fn submit_quiz(&self) -> AppResult<QuizResponse> {
        let user_id = self
            .lock_user()
            .as_ref()
            .map(|u| u.id)
            .ok_or_else(|| AppError::ValidationError("no registered user".to_string()))?;

        let (snapshot, had_remote_record) = {
            let mut session = self.lock_session();
            let Some(quiz) = &session.quiz else {
                return Err(AppError::ValidationError(
                    "no quiz in progress".to_string(),
                ));
            };
            let missing: Vec<&str> = quiz
                .required_question_ids()
                .into_iter()
                .filter(|id| !session.is_question_answered(id))
                .collect();
            if !missing.is_empty() {
                return Err(AppError::ValidationError(format!(
                    "unanswered required questions: {}",
                    missing.join(", ")
                )));
            }

            let had_remote_record = session.remote_created;
            session.complete();
            session.mark_pushed();
            self.cache.set(keys::QUIZ_SESSION, &*session);
            (session.clone(), had_remote_record)
        };

        // to_record only returns None without a quiz, checked above.
        let Some(mut record) = snapshot.to_record(user_id, false) else {
            return Err(AppError::InternalError(
                "completed session lost its quiz".to_string(),
            ));
        };

        if let Some(store) = &self.responses {
            if let Err(err) = store.upsert(&record).await {
                warn!("could not persist submission {} locally: {}", record.id, err);
            }
        }

        let result = if self.connectivity.is_online() {
            if had_remote_record {
                self.remote.update_quiz_response(record.id, &record).await
            } else {
                self.remote.create_quiz_response(&record).await
            }
        } else {
            Err(AppError::RemoteError("offline".to_string()))
        };

        match result {
            Ok(_) => {
                info!("quiz {} submitted", record.quiz_id);
                record.synced = true;
                self.mark_synced_locally(record.id).await;
                self.cache.remove(keys::QUIZ_SESSION);
                Ok(record)
            }
            Err(err) => {
                warn!("submission {} not delivered, queueing: {}", record.id, err);
                self.queue
                    .enqueue(QueuePayload::ResponseUpsert(record))
                    .await;
                Err(AppError::RemoteError(
                    "submission stored locally; it will sync when the connection returns"
                        .to_string(),
                ))
            }
        }
    }

    /// Abandon the current attempt and forget its snapshot.
    pub fn reset_quiz(&self) {
        *self.lock_session() = QuizSession::new();
        self.cache.remove(keys::QUIZ_SESSION);
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.lock_user() = user;
    }

    pub fn current_user(&self) -> Option<User> {
        self.lock_user().clone()
    }

    // Read-side accessors; each takes the lock briefly and clones out.

    pub fn session(&self) -> QuizSession {
        self.lock_session().clone()
    }

    pub fn progress(&self) -> u8 {
        self.lock_session().progress
    }

    pub fn current_question(&self) -> Option<Question> {
        self.lock_session().current_question().cloned()
    }

    pub fn has_answered_all(&self) -> bool {
        self.lock_session().has_answered_all()
    }

    pub fn estimated_time_remaining(&self) -> u32 {
        self.lock_session().estimated_time_remaining()
    }

    fn schedule_save(&self) {
        // Outside a runtime (plain unit tests) the cache snapshot already
        // written is the fallback; callers can flush with save_progress.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let service = self.clone();
            handle.spawn(async move { service.save_progress().await });
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, QuizSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_user(&self) -> MutexGuard<'_, Option<User>> {
        self.user
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
