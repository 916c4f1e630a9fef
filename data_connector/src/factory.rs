//! Cache backend factory.

use std::sync::Arc;

use tracing::info;

use crate::{
    config::{CacheBackend, CacheConfig},
    core::CacheStore,
    memory::MemoryCacheStore,
    noop::NoOpCacheStore,
    redis::RedisCacheStore,
};

/// Build the configured cache backend.
pub fn create_cache_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, String> {
    config.validate()?;
    let store: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
        CacheBackend::None => Arc::new(NoOpCacheStore::new()),
        CacheBackend::Redis => {
            let redis = config
                .redis
                .clone()
                .ok_or_else(|| "cache.redis must be set when cache.backend is redis".to_string())?;
            Arc::new(RedisCacheStore::new(redis)?)
        }
    };
    info!(backend = store.backend(), "Cache store initialized");
    Ok(store)
}
