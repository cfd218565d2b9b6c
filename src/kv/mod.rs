//! Key-value store used to persist conversations.

mod memory;
mod rest;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Error, Result};
use async_trait::async_trait;

pub use memory::MemoryKvStore;
pub use rest::RestKvStore;

use crate::core::AppConfig;

/// The subset of Redis commands needed to store conversations and
/// index them per user.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Sets the given fields on the hash at `key`.
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<(), Error>;

    /// Returns every field of the hash at `key`, empty if missing.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, Error>;

    /// Adds `member` to the sorted set at `key` with `score`.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), Error>;

    /// Members of the sorted set at `key` from highest to lowest
    /// score, between the inclusive ranks `start` and `stop`.
    async fn zrevrange(&self, key: &str, start: usize, stop: usize)
    -> Result<Vec<String>, Error>;
}

pub type SharedKvStore = Arc<dyn KvStore>;

/// Picks the REST store when it's configured, otherwise falls back to
/// an in-process store that is lost on restart.
pub fn from_config(config: &AppConfig) -> SharedKvStore {
    match (&config.kv_rest_api_url, &config.kv_rest_api_token) {
        (Some(url), Some(token)) => {
            tracing::debug!("Using KV REST store at {}", url);
            Arc::new(RestKvStore::new(url, token))
        }
        _ => {
            tracing::warn!(
                "KV_REST_API_URL or KV_REST_API_TOKEN not set, conversations will be kept in memory"
            );
            Arc::new(MemoryKvStore::default())
        }
    }
}
