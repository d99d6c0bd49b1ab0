use market_core::MarketError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for MarketError {
    fn from(err: CacheError) -> Self {
        MarketError::Cache(err.to_string())
    }
}
