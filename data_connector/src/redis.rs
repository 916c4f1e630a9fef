//! Redis cache implementation
//!
//! Values are stored as JSON strings under `<key_prefix><key>`; TTLs map to `SET EX`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use serde_json::Value;

use crate::{
    config::RedisConfig,
    core::{CacheError, CacheResult, CacheStore},
};

pub struct RedisCacheStore {
    pool: Pool,
    key_prefix: String,
}

impl RedisCacheStore {
    pub fn new(config: RedisConfig) -> Result<Self, String> {
        config.validate()?;
        let mut cfg = Config::from_url(config.url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(config.pool_max));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| e.to_string())?;
        Ok(Self {
            pool,
            key_prefix: config.key_prefix,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn connection(&self) -> CacheResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}

impl Clone for RedisCacheStore {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            key_prefix: self.key_prefix.clone(),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(self.full_key(key))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        raw.map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> CacheResult<()> {
        let payload = serde_json::to_string(&value)?;
        let full_key = self.full_key(key);
        let mut conn = self.connection().await?;

        let result = match ttl {
            // SET EX rejects 0, so sub-second TTLs round up to one second
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(&full_key, payload, ttl.as_secs().max(1))
                    .await
            }
            None => conn.set::<_, _, ()>(&full_key, payload).await,
        };
        result.map_err(|e| CacheError::Unavailable(e.to_string()))
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn
            .del(self.full_key(key))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(removed > 0)
    }
}
