//! In-memory metrics collection

use crate::sink::ObservabilitySink;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Metrics collector keeping counters in process memory
///
/// Cloning is cheap and all clones share the same counters.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    models_loaded: AtomicU64,
    total_load_us: AtomicU64,
    inference_batches: AtomicU64,
    total_inference_us: AtomicU64,
    cache_hits: Mutex<BTreeMap<String, u64>>,
    cache_misses: Mutex<BTreeMap<String, u64>>,
    active_models: Mutex<BTreeMap<String, u64>>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache hits recorded for a version
    pub fn cache_hits(&self, version: &str) -> u64 {
        self.inner.cache_hits.lock().get(version).copied().unwrap_or(0)
    }

    /// Cache misses recorded for a version
    pub fn cache_misses(&self, version: &str) -> u64 {
        self.inner
            .cache_misses
            .lock()
            .get(version)
            .copied()
            .unwrap_or(0)
    }

    /// Number of classifiers activated for a version
    pub fn active_models(&self, version: &str) -> u64 {
        self.inner
            .active_models
            .lock()
            .get(version)
            .copied()
            .unwrap_or(0)
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            models_loaded: self.inner.models_loaded.load(Ordering::Relaxed),
            total_load_us: self.inner.total_load_us.load(Ordering::Relaxed),
            inference_batches: self.inner.inference_batches.load(Ordering::Relaxed),
            total_inference_us: self.inner.total_inference_us.load(Ordering::Relaxed),
            cache_hits: self.inner.cache_hits.lock().clone(),
            cache_misses: self.inner.cache_misses.lock().clone(),
            active_models: self.inner.active_models.lock().clone(),
        }
    }
}

fn bump(map: &Mutex<BTreeMap<String, u64>>, version: &str) {
    *map.lock().entry(version.to_string()).or_insert(0) += 1;
}

impl ObservabilitySink for MetricsCollector {
    fn record_model_load(&self, _model_name: &str, _version: &str, elapsed: Duration) {
        self.inner.models_loaded.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_load_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn model_activated(&self, _model_name: &str, version: &str) {
        bump(&self.inner.active_models, version);
    }

    fn record_inference(&self, _version: &str, elapsed: Duration) {
        self.inner.inference_batches.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_inference_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    fn record_cache_hit(&self, version: &str) {
        bump(&self.inner.cache_hits, version);
    }

    fn record_cache_miss(&self, version: &str) {
        bump(&self.inner.cache_misses, version);
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub models_loaded: u64,
    pub total_load_us: u64,
    pub inference_batches: u64,
    pub total_inference_us: u64,
    pub cache_hits: BTreeMap<String, u64>,
    pub cache_misses: BTreeMap<String, u64>,
    pub active_models: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Average batch latency in microseconds
    pub fn avg_inference_us(&self) -> u64 {
        if self.inference_batches == 0 {
            0
        } else {
            self.total_inference_us / self.inference_batches
        }
    }

    /// Cache hit rate across all versions
    pub fn cache_hit_rate(&self) -> f64 {
        let hits: u64 = self.cache_hits.values().sum();
        let misses: u64 = self.cache_misses.values().sum();
        if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        }
    }
}
