//! Edge cache store abstraction.
//!
//! The handler treats the store as an external key/value service: a `get`
//! followed by at most one `put`. Values are serialized records; freshness is
//! checked by the caller on read, never swept.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::{CacheError, LocationWeatherRecord};

/// Key/value store shared by all requests
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the raw value stored under `key`, if any.
    ///
    /// # Errors
    /// Returns `CacheError::Unavailable` when the backing service can't be reached.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`, replacing whatever was there.
    ///
    /// # Errors
    /// Returns `CacheError::Unavailable` when the backing service can't be reached.
    async fn put(&self, key: &str, value: String) -> Result<(), CacheError>;
}

/// Build the cache key for a client IP
pub fn cache_key(prefix: &str, ip: &str) -> String {
    format!("{}{}", prefix, ip)
}

pub fn encode_record(record: &LocationWeatherRecord) -> Result<String, CacheError> {
    Ok(serde_json::to_string(record)?)
}

pub fn decode_record(raw: &str) -> Result<LocationWeatherRecord, CacheError> {
    Ok(serde_json::from_str(raw)?)
}

/// Process-local store, for single-instance deployments and tests
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Raw value under `key`, bypassing the async interface
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}
