use std::env;

use crate::token;

#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the SQLite file backing the durable local store. The special
    /// value `:memory:` opens an in-memory database.
    pub db_path: String,
    /// Path to the JSON file backing the lightweight key-value cache.
    pub cache_path: String,
    /// Minimum progress advance (percentage points) between remote pushes.
    pub push_threshold: u8,
    /// Resume tokens older than this horizon are treated as expired.
    pub token_expiry_hours: i64,
    /// Connectivity state assumed at startup when the platform gives no
    /// answer of its own.
    pub start_online: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            db_path: env::var("SURVEY_DB_PATH").unwrap_or_else(|_| "survey_sync.db".to_string()),
            cache_path: env::var("SURVEY_CACHE_PATH")
                .unwrap_or_else(|_| "survey_cache.json".to_string()),
            push_threshold: env::var("SURVEY_PUSH_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            token_expiry_hours: env::var("SURVEY_TOKEN_EXPIRY_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(token::DEFAULT_EXPIRY_HOURS),
            start_online: env::var("SURVEY_START_ONLINE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            db_path: ":memory:".to_string(),
            cache_path: std::env::temp_dir()
                .join(format!("survey_cache_{}.json", uuid::Uuid::new_v4()))
                .to_string_lossy()
                .into_owned(),
            push_threshold: 10,
            token_expiry_hours: token::DEFAULT_EXPIRY_HOURS,
            start_online: true,
        }
    }
}
