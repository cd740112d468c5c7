//! Pending-write queue: remote mutations that could not be delivered, held
//! durably until a drain replays them. Every entry carries the full state of
//! the thing being written, so items are independent and replaying an old one
//! after a newer one is harmless.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::connectivity::ConnectivityMonitor;
use crate::errors::AppResult;
use crate::models::domain::{OfflineQueueItem, QueuePayload};
use crate::remote::RemoteStore;
use crate::repositories::{OfflineQueueStore, QuizResponseStore};

/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct OfflineQueueService {
    /// In-memory working set; the durable store mirrors it after every change.
    items: Arc<Mutex<Vec<OfflineQueueItem>>>,
    store: Option<Arc<dyn OfflineQueueStore>>,
    responses: Option<Arc<dyn QuizResponseStore>>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<ConnectivityMonitor>,
    /// At most one drain runs at a time; overlapping triggers coalesce.
    draining: Arc<AtomicBool>,
    /// Set by a trigger that lost the `draining` race; the running drain
    /// picks it up as a request for one more pass.
    rerun: Arc<AtomicBool>,
}

impl OfflineQueueService {
    /// Build the queue, reloading whatever survived the last shutdown. A
    /// store read failure starts the queue empty rather than failing startup;
    /// the durable rows are still there for the next launch.
    pub async fn load(
        store: Option<Arc<dyn OfflineQueueStore>>,
        responses: Option<Arc<dyn QuizResponseStore>>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let items = match &store {
            Some(store) => match store.find_all().await {
                Ok(items) => {
                    let pending = items.iter().filter(|i| !i.acknowledged).count();
                    if pending > 0 {
                        info!("reloaded offline queue: {} pending write(s)", pending);
                    }
                    items
                }
                Err(err) => {
                    warn!("could not reload offline queue, starting empty: {}", err);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        OfflineQueueService {
            items: Arc::new(Mutex::new(items)),
            store,
            responses,
            remote,
            connectivity,
            draining: Arc::new(AtomicBool::new(false)),
            rerun: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a remote mutation for later delivery. If we are online the
    /// direct push just failed, so kick a drain in the background instead of
    /// waiting for the next connectivity transition.
    pub async fn enqueue(&self, payload: QueuePayload) -> OfflineQueueItem {
        let item = OfflineQueueItem::new(payload);
        info!("queueing {} write {}", item.kind(), item.id);

        self.persist(&item).await;
        self.items.lock().await.push(item.clone());

        if self.connectivity.is_online() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let queue = self.clone();
                handle.spawn(async move { queue.drain().await });
            }
        }
        item
    }

    /// Replay pending writes in enqueue order. Items that fail stay queued
    /// with their retry count bumped; items at the retry ceiling are skipped.
    /// Stops early if connectivity drops mid-drain.
    ///
    /// A trigger that arrives while a drain is in flight does not stack a
    /// second loop; it requests a rerun, and the running drain takes further
    /// passes until no request is outstanding. Writes enqueued mid-drain are
    /// therefore delivered by this drain, not stranded until the next
    /// connectivity transition.
    pub async fn drain(&self) {
        loop {
            if self
                .draining
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                debug!("drain already in progress, requesting another pass");
                self.rerun.store(true, Ordering::SeqCst);
                return;
            }

            loop {
                self.rerun.store(false, Ordering::SeqCst);
                self.drain_pass().await;
                if !self.rerun.load(Ordering::SeqCst) {
                    break;
                }
            }
            self.draining.store(false, Ordering::SeqCst);

            // A rerun request can land between the last check and the guard
            // release; claim the guard again for it instead of dropping it.
            if !self.rerun.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    async fn drain_pass(&self) {
        let pending: Vec<OfflineQueueItem> = {
            let items = self.items.lock().await;
            items
                .iter()
                .filter(|i| !i.acknowledged && !i.is_exhausted())
                .cloned()
                .collect()
        };
        if !pending.is_empty() {
            info!("draining offline queue: {} pending write(s)", pending.len());
        }

        for item in pending {
            if !self.connectivity.is_online() {
                info!("connectivity lost mid-drain, stopping");
                return;
            }
            match self.dispatch(&item.payload).await {
                Ok(()) => self.acknowledge(item.id).await,
                Err(err) => {
                    warn!(
                        "queued {} write {} failed on attempt {}: {}",
                        item.kind(),
                        item.id,
                        item.retry_count + 1,
                        err
                    );
                    self.record_failure(item.id).await;
                }
            }
        }
    }

    async fn dispatch(&self, payload: &QueuePayload) -> AppResult<()> {
        match payload {
            QueuePayload::UserCreate(user) => {
                self.remote.create_user(user).await?;
            }
            QueuePayload::ResponseUpsert(response) => {
                self.remote.create_quiz_response(response).await?;
            }
        }
        Ok(())
    }

    /// Mark a delivered item acknowledged. Acknowledged items are kept, not
    /// deleted; the durable row doubles as a delivery log.
    async fn acknowledge(&self, id: Uuid) {
        let updated = {
            let mut items = self.items.lock().await;
            items.iter_mut().find(|i| i.id == id).map(|item| {
                item.acknowledged = true;
                item.clone()
            })
        };
        let Some(item) = updated else { return };

        info!("queued {} write {} delivered", item.kind(), item.id);
        self.persist(&item).await;

        if let QueuePayload::ResponseUpsert(response) = &item.payload {
            if let Some(responses) = &self.responses {
                if let Err(err) = responses.mark_synced(response.id, true).await {
                    warn!("could not mark response {} synced: {}", response.id, err);
                }
            }
        }
    }

    async fn record_failure(&self, id: Uuid) {
        let updated = {
            let mut items = self.items.lock().await;
            items.iter_mut().find(|i| i.id == id).map(|item| {
                item.record_failure();
                item.clone()
            })
        };
        let Some(item) = updated else { return };

        if item.is_exhausted() {
            error!(
                "queued {} write {} exhausted its retries; leaving it for inspection",
                item.kind(),
                item.id
            );
        }
        self.persist(&item).await;
    }

    async fn persist(&self, item: &OfflineQueueItem) {
        if let Some(store) = &self.store {
            if let Err(err) = store.upsert(item).await {
                warn!("could not persist queue item {}: {}", item.id, err);
            }
        }
    }

    /// Writes still awaiting delivery (and still eligible for retry).
    pub async fn pending_count(&self) -> usize {
        self.items
            .lock()
            .await
            .iter()
            .filter(|i| !i.acknowledged && !i.is_exhausted())
            .count()
    }

    /// Writes that hit the retry ceiling without being delivered.
    pub async fn stuck_count(&self) -> usize {
        self.items
            .lock()
            .await
            .iter()
            .filter(|i| !i.acknowledged && i.is_exhausted())
            .count()
    }

    /// Total items, acknowledged ones included.
    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    pub async fn items(&self) -> Vec<OfflineQueueItem> {
        self.items.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.items.lock().await.clear();
        if let Some(store) = &self.store {
            if let Err(err) = store.clear().await {
                warn!("could not clear durable queue: {}", err);
            }
        }
    }
}
