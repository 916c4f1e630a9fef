// core.rs
//
// Core types for the data connector module.
// Contains the cache trait, the timestamped entry envelope and the error types
// shared by every backend.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Result alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Error type for cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend could not be reached or rejected the command.
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value cache shared by manifest builders and provider managers.
///
/// Values are JSON documents. Writers do not coordinate; the last write for a key wins.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;

    /// Store `value` under `key`. `ttl = None` keeps the entry until overwritten or deleted.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> CacheResult<()>;

    /// Returns true if an entry was removed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

/// Envelope persisted for every cached artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub written_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, value: T) -> Self {
        Self {
            key: key.into(),
            value,
            written_at: Utc::now(),
        }
    }
}

/// Read and decode a [`CacheEntry`].
///
/// A payload that no longer decodes is reported as a miss so callers rebuild it.
pub async fn get_entry<T: DeserializeOwned>(
    store: &dyn CacheStore,
    key: &str,
) -> CacheResult<Option<CacheEntry<T>>> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    match serde_json::from_value::<CacheEntry<T>>(raw) {
        Ok(entry) => Ok(Some(entry)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
            Ok(None)
        }
    }
}

/// Encode `value` in a [`CacheEntry`] envelope and store it.
pub async fn put_entry<T: Serialize>(
    store: &dyn CacheStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> CacheResult<()> {
    let entry = CacheEntry::new(key, value);
    let raw = serde_json::to_value(&entry)?;
    store.set(key, raw, ttl).await
}
