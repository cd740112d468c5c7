use std::sync::Arc;

use log::{info, warn};

use crate::{
    cache::{keys, KvCache},
    config::Config,
    connectivity::ConnectivityMonitor,
    db::LocalDatabase,
    remote::RemoteStore,
    repositories::{
        OfflineQueueStore, QuizResponseStore, SqliteOfflineQueueRepository,
        SqliteQuizResponseRepository, SqliteUserRepository, UserStore,
    },
    services::{OfflineQueueService, SessionService, UserService},
};

/// Everything wired together: cache, durable store, connectivity, queue, and
/// the services on top. The remote adapter is injected; the sync core never
/// constructs one itself.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<KvCache>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub queue: OfflineQueueService,
    pub user_service: Arc<UserService>,
    pub session_service: SessionService,
}

impl AppState {
    /// Build the full stack. Never fails: a durable store that cannot open
    /// drops the app to cache-only operation, which is still a working
    /// offline-first setup for the current run.
    pub async fn new(config: Config, remote: Arc<dyn RemoteStore>) -> Self {
        let cache = Arc::new(KvCache::open(&config.cache_path));

        // A user who explicitly went offline last run stays offline until
        // told otherwise.
        let offline_flag = cache.get::<bool>(keys::OFFLINE_MODE).unwrap_or(false);
        let connectivity = Arc::new(ConnectivityMonitor::new(
            config.start_online && !offline_flag,
        ));

        let db = match LocalDatabase::connect(&config).await {
            Ok(db) => Some(db),
            Err(err) => {
                warn!("durable store unavailable, running cache-only: {}", err);
                None
            }
        };
        let users: Option<Arc<dyn UserStore>> = db
            .as_ref()
            .map(|db| Arc::new(SqliteUserRepository::new(db)) as Arc<dyn UserStore>);
        let responses: Option<Arc<dyn QuizResponseStore>> = db
            .as_ref()
            .map(|db| Arc::new(SqliteQuizResponseRepository::new(db)) as Arc<dyn QuizResponseStore>);
        let queue_store: Option<Arc<dyn OfflineQueueStore>> = db
            .as_ref()
            .map(|db| Arc::new(SqliteOfflineQueueRepository::new(db)) as Arc<dyn OfflineQueueStore>);

        let queue = OfflineQueueService::load(
            queue_store,
            responses.clone(),
            remote.clone(),
            connectivity.clone(),
        )
        .await;

        // Every reconnect drains whatever accumulated while offline.
        let drain_queue = queue.clone();
        connectivity.subscribe(move |online| {
            if online {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let queue = drain_queue.clone();
                    handle.spawn(async move { queue.drain().await });
                }
            }
        });

        let user_service = Arc::new(UserService::new(
            cache.clone(),
            users,
            queue.clone(),
            remote.clone(),
            connectivity.clone(),
            config.token_expiry_hours,
        ));
        let session_service = SessionService::new(
            cache.clone(),
            responses,
            queue.clone(),
            remote,
            connectivity.clone(),
            config.push_threshold,
        );

        if let Some(user) = user_service.current_user() {
            info!("resuming as cached user {}", user.id);
            session_service.set_user(Some(user));
        }
        session_service.load_progress();

        AppState {
            config: Arc::new(config),
            cache,
            connectivity,
            queue,
            user_service,
            session_service,
        }
    }

    /// Report a connectivity change. Going online drains the queue through
    /// the transition subscription; the flag is cached so the next launch
    /// starts in the same mode.
    pub fn set_online(&self, online: bool) {
        self.cache.set(keys::OFFLINE_MODE, &!online);
        self.connectivity.set_online(online);
    }
}
