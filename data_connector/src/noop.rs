//! NoOp cache implementation
//!
//! Every read misses and every write is discarded - useful when caching is disabled.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::core::{CacheResult, CacheStore};

/// No-op cache that never retains anything
#[derive(Default, Debug, Clone, Copy)]
pub struct NoOpCacheStore;

impl NoOpCacheStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheStore for NoOpCacheStore {
    fn backend(&self) -> &'static str {
        "none"
    }

    async fn get(&self, _key: &str) -> CacheResult<Option<Value>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_noop_never_hits() {
        let store = NoOpCacheStore::new();
        store.set("k", json!(true), None).await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        assert!(!store.delete("k").await.unwrap());
    }
}
