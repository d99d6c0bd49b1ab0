//! Response caching: a TTL store behind a trait, deterministic keys and a
//! memoization wrapper for expensive calls.

pub mod error;
pub mod key;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use key::CacheKey;
pub use memory::MemoryCache;
pub use redis_store::RedisCache;
pub use store::CacheStore;

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Expiry per kind of cached data.
pub mod ttl {
    use std::time::Duration;

    pub const LIVE_SNAPSHOT: Duration = Duration::from_secs(2 * 60 * 60);
    pub const PRICE_CHART: Duration = Duration::from_secs(10 * 60);
    pub const MARKET_LIST: Duration = Duration::from_secs(5 * 60);
    pub const SYMBOL_LIST: Duration = Duration::from_secs(24 * 60 * 60);
    pub const NEWS_LIST: Duration = Duration::from_secs(5 * 60 * 60);
    pub const COIN_DETAILS: Duration = Duration::from_secs(60 * 60);
    pub const PREDICTION: Duration = Duration::from_secs(60 * 60);
    pub const ANALYSIS: Duration = Duration::from_secs(60 * 60);
}

#[derive(Debug, Clone, Default)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
        }
    }
}

/// Typed JSON view over a [`CacheStore`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    /// Redis when `REDIS_URL` is set and reachable, otherwise in-memory.
    pub async fn from_config(config: &CacheConfig) -> Self {
        if let Some(url) = &config.redis_url {
            match RedisCache::connect(url).await {
                Ok(redis) => {
                    tracing::info!("Response cache: redis");
                    return Self::new(Arc::new(redis));
                }
                Err(e) => warn!("Redis unavailable ({}), falling back to in-memory cache", e),
            }
        }

        let memory = Arc::new(MemoryCache::new());
        memory.spawn_janitor(Duration::from_secs(60));
        tracing::info!("Response cache: in-memory");
        Self::new(memory)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> CacheResult<Option<T>> {
        match self.store.get(key.as_str()).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key.as_str(), raw, ttl).await
    }

    pub async fn delete(&self, key: &CacheKey) -> CacheResult<()> {
        self.store.delete(key.as_str()).await
    }

    /// Return the cached value for `key`, or run `compute` and cache its `Ok`.
    ///
    /// Errors from `compute` are returned and never cached. Cache failures are
    /// logged and degrade to a recompute. Two concurrent misses both compute.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.get::<T>(key).await {
            Ok(Some(hit)) => {
                debug!("Cache hit: {}", key);
                return Ok(hit);
            }
            Ok(None) => debug!("Cache miss: {}", key),
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let value = compute().await?;

        if let Err(e) = self.set(key, &value, ttl).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
        Ok(value)
    }
}
