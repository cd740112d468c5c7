//! Lightweight synchronous key-value cache backed by a single JSON file.
//!
//! This is the fast-path mirror for the handful of values needed before the
//! durable store has finished initializing (current user, resume token, the
//! active session snapshot, the offline-mode flag). The cache may be stale;
//! the durable store is canonical. Every operation degrades to a safe
//! default when the backing file is unavailable - it never errors.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const RESUME_TOKEN: &str = "resume_token";
    pub const QUIZ_SESSION: &str = "quiz_session";
    pub const OFFLINE_MODE: &str = "offline_mode";
}

pub struct KvCache {
    path: Option<PathBuf>,
    entries: Mutex<HashMap<String, Value>>,
}

impl KvCache {
    /// Open the cache at `path`, loading any existing content. A missing
    /// file is an empty cache; an unreadable or corrupt one is replaced on
    /// the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!("cache file {} is corrupt, starting empty: {}", path.display(), err);
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!("cache file {} unreadable, starting empty: {}", path.display(), err);
                HashMap::new()
            }
        };

        KvCache {
            path: Some(path),
            entries: Mutex::new(entries),
        }
    }

    /// Memory-only cache; used when no backing storage is available.
    pub fn in_memory() -> Self {
        KvCache {
            path: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.lock();
        let value = entries.get(key)?.clone();
        drop(entries);
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("cache value for {} has unexpected shape: {}", key, err);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(err) => {
                warn!("failed to serialize cache value for {}: {}", key, err);
                return;
            }
        };
        let mut entries = self.lock();
        entries.insert(key.to_string(), serialized);
        self.flush(&entries);
    }

    pub fn remove(&self, key: &str) {
        let mut entries = self.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries);
        }
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.flush(&entries);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, entries: &HashMap<String, Value>) {
        let Some(path) = &self.path else {
            return;
        };
        let raw = match serde_json::to_string(entries) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed to serialize cache: {}", err);
                return;
            }
        };
        if let Err(err) = fs::write(path, raw) {
            debug!("cache write to {} failed: {}", path.display(), err);
        }
    }
}
