//! Per-text prediction result cache

use crate::store::{KeyValueStore, RedisStore};
use sentiserve_core::PredictionItemResult;
use sentiserve_telemetry::ObservabilitySink;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache tuning
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Expiry applied to stored results
    pub ttl: Duration,

    /// Upper bound on a single backend call
    pub timeout: Duration,

    /// Upper bound on establishing the backend connection
    pub connect_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            timeout: Duration::from_millis(250),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Cache of prediction results keyed by model version and input text
///
/// A cache without a backend is valid and misses on every read.
pub struct ResultCache {
    store: Option<Arc<dyn KeyValueStore>>,
    sink: Arc<dyn ObservabilitySink>,
    config: CacheConfig,
}

impl ResultCache {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        sink: Arc<dyn ObservabilitySink>,
        config: CacheConfig,
    ) -> Self {
        Self {
            store: Some(store),
            sink,
            config,
        }
    }

    /// A cache with no backend
    pub fn disabled(sink: Arc<dyn ObservabilitySink>, config: CacheConfig) -> Self {
        Self {
            store: None,
            sink,
            config,
        }
    }

    /// Connect to Redis, degrading to a disabled cache if it is unreachable
    pub async fn connect(
        url: &str,
        sink: Arc<dyn ObservabilitySink>,
        config: CacheConfig,
    ) -> Self {
        match tokio::time::timeout(config.connect_timeout, RedisStore::connect(url)).await {
            Ok(Ok(store)) => {
                info!(backend = store.name(), "Result cache enabled");
                Self::new(Arc::new(store), sink, config)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Result cache unavailable, continuing without it");
                Self::disabled(sink, config)
            }
            Err(_) => {
                warn!(
                    timeout_ms = config.connect_timeout.as_millis() as u64,
                    "Result cache connection timed out, continuing without it"
                );
                Self::disabled(sink, config)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Expiry applied by the dispatcher when storing results
    pub fn default_ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Derive the storage key for a version and raw input text
    pub fn cache_key(version: &str, text: &str) -> String {
        let digest = Sha256::digest(text.as_bytes());
        format!("pred:{}:{:x}", version, digest)
    }

    /// Look up a stored result
    ///
    /// Backend errors, timeouts and undecodable entries are all misses.
    /// Every call records exactly one hit or miss for `version`.
    pub async fn get(&self, version: &str, text: &str) -> Option<PredictionItemResult> {
        let found = match &self.store {
            Some(store) => self.lookup(store.as_ref(), version, text).await,
            None => None,
        };

        if found.is_some() {
            self.sink.record_cache_hit(version);
        } else {
            self.sink.record_cache_miss(version);
        }
        found
    }

    async fn lookup(
        &self,
        store: &dyn KeyValueStore,
        version: &str,
        text: &str,
    ) -> Option<PredictionItemResult> {
        let key = Self::cache_key(version, text);

        let raw = match tokio::time::timeout(self.config.timeout, store.get(&key)).await {
            Ok(Ok(raw)) => raw?,
            Ok(Err(e)) => {
                debug!(key, error = %e, "Cache read failed");
                return None;
            }
            Err(_) => {
                debug!(key, "Cache read timed out");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a result; failures are ignored
    pub async fn set(&self, version: &str, text: &str, result: &PredictionItemResult, ttl: Duration) {
        let Some(store) = &self.store else {
            return;
        };

        let key = Self::cache_key(version, text);
        let value = match serde_json::to_string(result) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };

        match tokio::time::timeout(self.config.timeout, store.set(&key, &value, ttl)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(key, error = %e, "Cache write failed"),
            Err(_) => debug!(key, "Cache write timed out"),
        }
    }
}
