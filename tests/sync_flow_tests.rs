//! End-to-end offline-first flows against a scriptable in-memory remote.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use survey_sync::{
    app_state::AppState,
    cache::KvCache,
    config::Config,
    connectivity::ConnectivityMonitor,
    db::LocalDatabase,
    errors::{AppError, AppResult},
    models::domain::{
        Answer, Question, QuestionKind, QueuePayload, Quiz, QuizResponse, User, MAX_SYNC_RETRIES,
    },
    models::dto::request::RegisterUserRequest,
    repositories::{
        OfflineQueueStore, QuizResponseStore, SqliteOfflineQueueRepository,
        SqliteQuizResponseRepository,
    },
    services::{OfflineQueueService, SessionService},
};

/// In-memory remote store whose failures can be toggled from the test.
#[derive(Default)]
struct FakeRemote {
    failing: AtomicBool,
    create_user_calls: AtomicUsize,
    users: Mutex<HashMap<Uuid, User>>,
    responses: Mutex<HashMap<Uuid, QuizResponse>>,
}

impl FakeRemote {
    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> AppResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(AppError::RemoteError("remote unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    fn response(&self, id: Uuid) -> Option<QuizResponse> {
        self.responses.lock().unwrap().get(&id).cloned()
    }

    fn response_count(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl survey_sync::remote::RemoteStore for FakeRemote {
    async fn create_user(&self, user: &User) -> AppResult<User> {
        self.create_user_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.users.lock().unwrap().insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_resume_token(&self, token: &str) -> AppResult<Option<User>> {
        self.check()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.resume_token == token)
            .cloned())
    }

    async fn create_quiz_response(&self, response: &QuizResponse) -> AppResult<QuizResponse> {
        self.check()?;
        self.responses
            .lock()
            .unwrap()
            .insert(response.id, response.clone());
        Ok(response.clone())
    }

    async fn update_quiz_response(
        &self,
        id: Uuid,
        response: &QuizResponse,
    ) -> AppResult<QuizResponse> {
        self.check()?;
        self.responses.lock().unwrap().insert(id, response.clone());
        Ok(response.clone())
    }

    async fn get_quiz_responses_by_user(&self, user_id: Uuid) -> AppResult<Vec<QuizResponse>> {
        self.check()?;
        Ok(self
            .responses
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_quiz(&self, _id: &str) -> AppResult<Option<Quiz>> {
        self.check()?;
        Ok(None)
    }
}

fn offline_config() -> Config {
    Config {
        db_path: ":memory:".to_string(),
        cache_path: std::env::temp_dir()
            .join(format!("survey_cache_{}.json", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned(),
        push_threshold: 10,
        token_expiry_hours: 720,
        start_online: false,
    }
}

fn survey(question_count: usize) -> Quiz {
    let questions = (1..=question_count)
        .map(|n| Question {
            id: format!("q-{}", n),
            prompt: format!("Question {}", n),
            required: true,
            kind: QuestionKind::YesNo,
        })
        .collect();
    Quiz {
        id: "quiz-1".to_string(),
        title: "Feedback survey".to_string(),
        description: "Tell us how it went".to_string(),
        questions,
        estimated_time: 10,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn registration() -> RegisterUserRequest {
    RegisterUserRequest {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: "1234567890".to_string(),
    }
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn wait_for_empty_queue(state: &AppState) {
    for _ in 0..100 {
        if state.queue.pending_count().await == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("queue did not drain");
}

#[tokio::test]
async fn test_offline_work_syncs_on_reconnect() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());
    let state = AppState::new(offline_config(), remote.clone()).await;
    assert!(!state.connectivity.is_online());

    // Register and answer three of five questions, fully offline.
    let user = state
        .user_service
        .register(&registration())
        .await
        .expect("offline registration succeeds");
    state.session_service.set_user(Some(user.clone()));
    state
        .session_service
        .start_quiz(survey(5))
        .await
        .expect("start");
    state
        .session_service
        .answer_question("q-1", Answer::Bool(true));
    state
        .session_service
        .answer_question("q-2", Answer::Bool(false));
    state
        .session_service
        .answer_question("q-3", Answer::Bool(true));
    state.session_service.save_progress().await;

    assert_eq!(state.session_service.progress(), 60);
    assert_eq!(remote.user_count(), 0);
    assert!(state.queue.pending_count().await >= 1);

    // Reconnect: the transition listener drains everything.
    state.set_online(true);
    wait_for_empty_queue(&state).await;

    assert_eq!(remote.user_count(), 1);
    let response_id = state.session_service.session().response_id;
    let pushed = remote.response(response_id).expect("response reached remote");
    assert_eq!(pushed.progress, 60);
    assert_eq!(pushed.user_id, user.id);
}

#[tokio::test]
async fn test_offline_submission_is_delivered_later() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());
    let state = AppState::new(offline_config(), remote.clone()).await;

    let user = state
        .user_service
        .register(&registration())
        .await
        .expect("register");
    state.session_service.set_user(Some(user));
    state
        .session_service
        .start_quiz(survey(2))
        .await
        .expect("start");
    state
        .session_service
        .answer_question("q-1", Answer::Bool(true));
    state
        .session_service
        .answer_question("q-2", Answer::Bool(true));
    state.session_service.save_progress().await;

    // Submission is rejected as undeliverable but kept.
    let err = state
        .session_service
        .submit_quiz()
        .await
        .expect_err("offline submit reports the remote failure");
    assert!(matches!(err, AppError::RemoteError(_)));
    let response_id = state.session_service.session().response_id;

    state.set_online(true);
    wait_for_empty_queue(&state).await;

    let delivered = remote.response(response_id).expect("submission delivered");
    assert_eq!(delivered.progress, 100);
    assert!(delivered.completed_at.is_some());
    assert!(state.queue.items().await.iter().all(|i| i.acknowledged));
}

#[tokio::test]
async fn test_second_submit_updates_the_same_remote_record() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());
    let config = offline_config();
    let db = LocalDatabase::connect(&config).await.expect("open db");
    let responses: Arc<dyn QuizResponseStore> = Arc::new(SqliteQuizResponseRepository::new(&db));
    let connectivity = Arc::new(ConnectivityMonitor::new(false));
    let queue = OfflineQueueService::load(
        None,
        Some(responses.clone()),
        remote.clone(),
        connectivity.clone(),
    )
    .await;
    let session = SessionService::new(
        Arc::new(KvCache::in_memory()),
        Some(responses.clone()),
        queue.clone(),
        remote.clone(),
        connectivity.clone(),
        10,
    );

    let user = User::new("Jane Doe", "jane@example.com", "(123) 456-7890", "AB12CD34-XY98ZW76");
    session.set_user(Some(user));
    session.start_quiz(survey(2)).await.expect("start");
    session.answer_question("q-1", Answer::Bool(true));
    session.answer_question("q-2", Answer::Bool(false));
    session.save_progress().await;

    // First submit while offline: durable but undelivered.
    let err = session
        .submit_quiz()
        .await
        .expect_err("offline submit reports the remote failure");
    assert!(matches!(err, AppError::RemoteError(_)));
    let response_id = session.session().response_id;
    let stored = responses
        .find_by_id(response_id)
        .await
        .expect("lookup")
        .expect("stored locally");
    assert!(!stored.synced);

    // Delivery through the queue flips the durable synced flag.
    connectivity.set_online(true);
    queue.drain().await;
    assert_eq!(queue.pending_count().await, 0);
    let stored = responses
        .find_by_id(response_id)
        .await
        .expect("lookup")
        .expect("stored locally");
    assert!(stored.synced);
    assert_eq!(remote.response_count(), 1);

    // Submitting again reuses the attempt's response id and updates the
    // existing remote record instead of creating a second one.
    let second = session.submit_quiz().await.expect("online resubmit");
    assert_eq!(second.id, response_id);
    assert!(second.synced);
    assert_eq!(remote.response_count(), 1);
    let delivered = remote.response(response_id).expect("record on remote");
    assert_eq!(delivered.progress, 100);
    let stored = responses
        .find_by_id(response_id)
        .await
        .expect("lookup")
        .expect("stored locally");
    assert!(stored.synced);
}

#[tokio::test]
async fn test_retry_cap_freezes_undeliverable_writes() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());
    remote.set_failing(true);

    let config = offline_config();
    let db = LocalDatabase::connect(&config).await.expect("open db");
    let store: Arc<dyn OfflineQueueStore> = Arc::new(SqliteOfflineQueueRepository::new(&db));
    let connectivity = Arc::new(ConnectivityMonitor::new(false));
    let queue = OfflineQueueService::load(
        Some(store.clone()),
        None,
        remote.clone(),
        connectivity.clone(),
    )
    .await;

    let user = User::new("Jane Doe", "jane@example.com", "(123) 456-7890", "AB12CD34-XY98ZW76");
    queue.enqueue(QueuePayload::UserCreate(user)).await;
    connectivity.set_online(true);

    for _ in 0..MAX_SYNC_RETRIES + 3 {
        queue.drain().await;
    }

    assert_eq!(
        remote.create_user_calls.load(Ordering::SeqCst),
        MAX_SYNC_RETRIES as usize
    );
    assert_eq!(queue.pending_count().await, 0);
    assert_eq!(queue.stuck_count().await, 1);

    // The exhausted item survives durably with its retry count.
    let rows = store.find_unacknowledged().await.expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].retry_count, MAX_SYNC_RETRIES);

    // Recovery once the remote comes back is manual, not automatic.
    remote.set_failing(false);
    queue.drain().await;
    assert_eq!(queue.stuck_count().await, 1);
}

#[tokio::test]
async fn test_resume_token_recovers_session_from_remote() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());

    // First device registers online.
    let first = AppState::new(
        Config {
            start_online: true,
            ..offline_config()
        },
        remote.clone(),
    )
    .await;
    let user = first
        .user_service
        .register(&registration())
        .await
        .expect("register");
    assert_eq!(remote.user_count(), 1);

    // Second device knows only the token.
    let second = AppState::new(
        Config {
            start_online: true,
            ..offline_config()
        },
        remote.clone(),
    )
    .await;
    let resumed = second
        .user_service
        .resume_session(&user.resume_token)
        .await
        .expect("resume");
    assert_eq!(resumed.id, user.id);
    assert_eq!(
        second.user_service.current_user().map(|u| u.id),
        Some(user.id)
    );
}

#[tokio::test]
async fn test_queue_survives_restart_on_shared_store() {
    init_logging();
    let remote = Arc::new(FakeRemote::default());
    remote.set_failing(true);

    let config = offline_config();
    let db = LocalDatabase::connect(&config).await.expect("open db");
    let store: Arc<dyn OfflineQueueStore> = Arc::new(SqliteOfflineQueueRepository::new(&db));
    let connectivity = Arc::new(ConnectivityMonitor::new(false));

    {
        let queue = OfflineQueueService::load(
            Some(store.clone()),
            None,
            remote.clone(),
            connectivity.clone(),
        )
        .await;
        let user =
            User::new("Jane Doe", "jane@example.com", "(123) 456-7890", "AB12CD34-XY98ZW76");
        queue.enqueue(QueuePayload::UserCreate(user)).await;
        assert_eq!(queue.pending_count().await, 1);
    }

    // A fresh service over the same store picks the write back up.
    remote.set_failing(false);
    let reloaded =
        OfflineQueueService::load(Some(store), None, remote.clone(), connectivity.clone()).await;
    assert_eq!(reloaded.pending_count().await, 1);

    connectivity.set_online(true);
    reloaded.drain().await;
    assert_eq!(reloaded.pending_count().await, 0);
    assert_eq!(remote.user_count(), 1);
}
