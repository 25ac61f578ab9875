//! Cache-backed weather request handler.
//!
//! One invocation reads the edge cache once and, on a miss, fetches upstream
//! and writes back once. Concurrent misses for the same key are not
//! coordinated; both fetch and the later write wins.

use edgecast_core::Config;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{cache_key, decode_record, encode_record, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::fallback::fallback_record;
use crate::fetch::LocationWeatherFetcher;
use crate::types::{FetchError, LocationWeatherRecord, WeatherResponse};

#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub key_prefix: String,
    /// Entries this old or older are stale
    pub ttl_millis: i64,
    /// Client IP used when the request carries none
    pub default_ip: String,
}

impl From<&Config> for HandlerSettings {
    fn from(config: &Config) -> Self {
        Self {
            key_prefix: config.cache.key_prefix.clone(),
            ttl_millis: config.cache.ttl_millis(),
            default_ip: config.defaults.client_ip.clone(),
        }
    }
}

pub struct EdgeHandler {
    store: Arc<dyn CacheStore>,
    fetcher: LocationWeatherFetcher,
    clock: Arc<dyn Clock>,
    settings: HandlerSettings,
}

impl EdgeHandler {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: LocationWeatherFetcher,
        settings: HandlerSettings,
    ) -> Self {
        Self {
            store,
            fetcher,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Build a handler with upstream clients configured from `config`.
    ///
    /// # Errors
    /// Returns `FetchError::Network` if the HTTP client can't be constructed.
    pub fn from_config(config: &Config, store: Arc<dyn CacheStore>) -> Result<Self, FetchError> {
        let fetcher = LocationWeatherFetcher::new(&config.upstream, config.defaults.clone())?;
        Ok(Self::new(store, fetcher, HandlerSettings::from(config)))
    }

    /// Replace the wall clock used for timestamps and freshness checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn default_ip(&self) -> &str {
        &self.settings.default_ip
    }

    /// Produce the weather response for `ip`. Never fails: upstream errors
    /// become the fallback record.
    pub async fn handle(&self, ip: &str) -> WeatherResponse {
        let started = Instant::now();
        let key = cache_key(&self.settings.key_prefix, ip);
        let now = self.clock.now_millis();

        if let Some(record) = self.read_fresh(&key, now).await {
            tracing::info!("Edge cache hit for {}", key);
            return WeatherResponse {
                record: record.as_cache_hit(),
                latency: elapsed_millis(started),
                error: None,
            };
        }

        tracing::info!("Edge cache miss for {}, calling upstream", key);

        match self.fetcher.fetch(ip, now).await {
            Ok(record) => {
                self.write(&key, &record).await;
                WeatherResponse {
                    record,
                    latency: elapsed_millis(started),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!("Upstream fetch failed for {}, serving fallback: {}", ip, e);
                WeatherResponse {
                    record: fallback_record(ip, now),
                    latency: elapsed_millis(started),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Cached record under `key` if one exists, decodes, and is still fresh.
    /// Store failures and undecodable values count as a miss.
    async fn read_fresh(&self, key: &str, now: i64) -> Option<LocationWeatherRecord> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        let record = match decode_record(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, e);
                return None;
            }
        };

        if record.is_fresh(now, self.settings.ttl_millis) {
            Some(record)
        } else {
            tracing::debug!(
                "Cache entry {} is stale ({} ms old)",
                key,
                now.saturating_sub(record.timestamp)
            );
            None
        }
    }

    async fn write(&self, key: &str, record: &LocationWeatherRecord) {
        let result = match encode_record(record) {
            Ok(value) => self.store.put(key, value).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => tracing::info!("Stored {} in edge cache", key),
            Err(e) => tracing::warn!("Cache write failed for {}: {}", key, e),
        }
    }
}

fn elapsed_millis(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
