//! Single source of truth for "are we online".
//!
//! State is read once at initialization from whatever platform primitive the
//! embedder has, then only updated through `set_online` transition events -
//! never polled per-operation, so one logical operation cannot race between
//! reading the state and using it. Offline is a normal state, not an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use log::{debug, info};

type Listener = Box<dyn Fn(bool) + Send + Sync>;

pub struct ConnectivityMonitor {
    online: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        ConnectivityMonitor {
            online: AtomicBool::new(initially_online),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a callback invoked on every transition, both directions.
    /// Callbacks run on the transitioning thread and must not subscribe
    /// re-entrantly.
    pub fn subscribe(&self, listener: impl Fn(bool) + Send + Sync + 'static) {
        self.lock_listeners().push(Box::new(listener));
    }

    /// Record a connectivity change. Listeners fire only on an actual
    /// transition, so rapid duplicate reports collapse into one
    /// notification per edge.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            debug!("connectivity unchanged (online={})", online);
            return;
        }

        info!(
            "connectivity transition: {} -> {}",
            if previous { "online" } else { "offline" },
            if online { "online" } else { "offline" }
        );
        for listener in self.lock_listeners().iter() {
            listener(online);
        }
    }

    fn lock_listeners(&self) -> std::sync::MutexGuard<'_, Vec<Listener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
