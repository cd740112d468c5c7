//! Registration, resume-token recovery, and contact edits.
//!
//! Registration always succeeds locally: the user lands in the cache and the
//! durable store first, and the remote create either happens inline or is
//! queued. Resume lookups prefer the remote copy and fall back to local
//! replicas when it is unreachable.

use std::sync::Arc;

use log::{info, warn};

use crate::cache::{keys, KvCache};
use crate::connectivity::ConnectivityMonitor;
use crate::errors::{AppError, AppResult};
use crate::models::domain::{QueuePayload, User};
use crate::models::dto::request::{RegisterUserRequest, UpdateUserRequest};
use crate::remote::RemoteStore;
use crate::repositories::UserStore;
use crate::services::offline_queue_service::OfflineQueueService;
use crate::token;
use crate::validation::{format_phone, validate_registration, validate_update};

pub struct UserService {
    cache: Arc<KvCache>,
    users: Option<Arc<dyn UserStore>>,
    queue: OfflineQueueService,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<ConnectivityMonitor>,
    token_expiry_hours: i64,
}

impl UserService {
    pub fn new(
        cache: Arc<KvCache>,
        users: Option<Arc<dyn UserStore>>,
        queue: OfflineQueueService,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
        token_expiry_hours: i64,
    ) -> Self {
        UserService {
            cache,
            users,
            queue,
            remote,
            connectivity,
            token_expiry_hours,
        }
    }

    /// Register a participant and issue their resume token. Never fails for
    /// remote reasons; an unreachable remote turns into a queued create.
    pub async fn register(&self, request: &RegisterUserRequest) -> AppResult<User> {
        validate_registration(request)?;

        let resume_token = token::generate();
        let mut user = User::from_request(request, &resume_token);
        user.phone = format_phone(&user.phone);
        info!("registering user {}", user.id);

        self.remember(&user).await;
        self.push_user(&user).await;
        Ok(user)
    }

    /// Recover a session from a resume token. Checks the remote first for
    /// the freshest copy; offline (or on remote failure) the local replicas
    /// answer instead.
    pub async fn resume_session(&self, resume_token: &str) -> AppResult<User> {
        let resume_token = resume_token.trim().to_uppercase();
        if !token::validate(&resume_token) {
            return Err(AppError::ValidationError(
                "resume token is not in a recognized format".to_string(),
            ));
        }
        if token::is_expired(&resume_token, self.token_expiry_hours) {
            return Err(AppError::ValidationError(
                "resume token has expired".to_string(),
            ));
        }

        if self.connectivity.is_online() {
            match self.remote.get_user_by_resume_token(&resume_token).await {
                Ok(Some(user)) => {
                    info!("resumed session for user {} from remote", user.id);
                    self.remember(&user).await;
                    return Ok(user);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("remote resume lookup failed, trying local replicas: {}", err);
                }
            }
        }

        if let Some(store) = &self.users {
            match store.find_by_resume_token(&resume_token).await {
                Ok(Some(user)) => {
                    info!("resumed session for user {} from local store", user.id);
                    self.remember(&user).await;
                    return Ok(user);
                }
                Ok(None) => {}
                Err(err) => warn!("local resume lookup failed: {}", err),
            }
        }

        // Last resort: the cached current user, if the token matches.
        if let Some(user) = self.cache.get::<User>(keys::CURRENT_USER) {
            if user.resume_token == resume_token {
                return Ok(user);
            }
        }

        Err(AppError::NotFound(
            "no session found for that resume token".to_string(),
        ))
    }

    /// Edit the current user's contact fields. Identity and resume token
    /// never change; the remote copy is refreshed through the same
    /// create/upsert path as registration.
    pub async fn update_user(&self, request: &UpdateUserRequest) -> AppResult<User> {
        validate_update(request)?;

        let mut user = self
            .cache
            .get::<User>(keys::CURRENT_USER)
            .ok_or_else(|| AppError::NotFound("no registered user".to_string()))?;

        let phone = request.phone.as_deref().map(format_phone);
        user.apply_contact_update(
            request.name.as_deref(),
            request.email.as_deref(),
            phone.as_deref(),
        );

        self.remember(&user).await;
        self.push_user(&user).await;
        Ok(user)
    }

    /// Drop the local identity. Queued writes are left alone; anything not
    /// yet delivered still belongs to the remote.
    pub fn logout(&self) {
        info!("logging out current user");
        self.cache.remove(keys::CURRENT_USER);
        self.cache.remove(keys::RESUME_TOKEN);
        self.cache.remove(keys::QUIZ_SESSION);
    }

    pub fn current_user(&self) -> Option<User> {
        self.cache.get(keys::CURRENT_USER)
    }

    pub fn resume_token(&self) -> Option<String> {
        self.cache.get(keys::RESUME_TOKEN)
    }

    /// Write the user to the cache and the durable store. Store trouble
    /// degrades with a warning; the cache copy keeps the app usable.
    async fn remember(&self, user: &User) {
        self.cache.set(keys::CURRENT_USER, user);
        self.cache.set(keys::RESUME_TOKEN, &user.resume_token);
        if let Some(store) = &self.users {
            if let Err(err) = store.upsert(user).await {
                warn!("could not persist user {} locally: {}", user.id, err);
            }
        }
    }

    /// Deliver the user record to the remote, queueing it on failure or
    /// while offline.
    async fn push_user(&self, user: &User) {
        if self.connectivity.is_online() {
            match self.remote.create_user(user).await {
                Ok(_) => return,
                Err(err) => warn!("remote user write failed, queueing: {}", err),
            }
        }
        self.queue
            .enqueue(QueuePayload::UserCreate(user.clone()))
            .await;
    }
}
