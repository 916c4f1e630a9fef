//! Data connector module for shared key-value caching.
//!
//! Provides cache backends for:
//! - Combined and filtered tool manifests
//! - Per-provider-server tool lists
//!
//! Supported backends:
//! - Memory (default)
//! - None (no-op)
//! - Redis

pub mod config;
mod core;
mod factory;
mod memory;
mod noop;
mod redis;

// Re-export core types and traits
pub use core::{get_entry, put_entry, CacheEntry, CacheError, CacheResult, CacheStore};

pub use config::{CacheBackend, CacheConfig, RedisConfig};
// Re-export factory
pub use factory::create_cache_store;
// Re-export memory and no-op implementations for testing
pub use memory::MemoryCacheStore;
pub use noop::NoOpCacheStore;
pub use redis::RedisCacheStore;
