use async_trait::async_trait;
use std::time::Duration;

use crate::error::CacheResult;

/// A TTL key-value store holding serialized values.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()>;

    async fn delete(&self, key: &str) -> CacheResult<()>;

    fn backend_name(&self) -> &'static str;
}
