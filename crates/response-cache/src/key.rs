use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::CacheResult;

/// Deterministic cache key: `operation:part:part:...`.
///
/// Large or structured inputs go through [`CacheKey::hashed`], which appends
/// the SHA-256 hex digest of their canonical JSON encoding (object keys sorted).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str) -> Self {
        Self(operation.to_string())
    }

    pub fn part(mut self, part: impl fmt::Display) -> Self {
        self.0.push(':');
        self.0.push_str(&part.to_string());
        self
    }

    pub fn hashed<T: Serialize + ?Sized>(self, value: &T) -> CacheResult<Self> {
        let canonical = serde_json::to_value(value)?;
        let bytes = serde_json::to_vec(&canonical)?;
        Ok(self.part(hex::encode(Sha256::digest(&bytes))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parts_are_joined() {
        let key = CacheKey::new("prediction").part("BTCUSDT").part(7);
        assert_eq!(key.as_str(), "prediction:BTCUSDT:7");
    }

    #[test]
    fn test_hash_is_stable_and_order_independent() {
        let a = CacheKey::new("x").hashed(&json!({"a": 1, "b": [1.5, 2.5]})).unwrap();
        let b = CacheKey::new("x").hashed(&json!({"b": [1.5, 2.5], "a": 1})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), "x:".len() + 64);
    }

    #[test]
    fn test_different_values_differ() {
        let a = CacheKey::new("x").hashed(&[1.0, 2.0]).unwrap();
        let b = CacheKey::new("x").hashed(&[1.0, 2.000001]).unwrap();
        assert_ne!(a, b);
    }
}
