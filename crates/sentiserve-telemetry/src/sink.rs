//! Observability sink consumed by the inference core
//!
//! The core reports load durations, active model counts, inference durations
//! and cache hit/miss signals. It owns no storage for them; whatever sink is
//! injected decides where they go.

use std::time::Duration;

/// Metric names shared by the exporter and the sinks
pub mod names {
    pub const MODEL_LOAD_SECONDS: &str = "model_load_seconds";
    pub const ACTIVE_MODELS: &str = "active_models_count";
    pub const MODEL_INFERENCE_SECONDS: &str = "model_inference_seconds";
    pub const CACHE_HITS: &str = "cache_hits_total";
    pub const CACHE_MISSES: &str = "cache_misses_total";
    pub const HTTP_REQUESTS: &str = "http_requests_total";
    pub const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
}

/// Model name used to tag inference samples
pub const INFERENCE_MODEL_NAME: &str = "sentiment";

/// Receiver for the core's observability signals
pub trait ObservabilitySink: Send + Sync {
    /// A classifier finished loading
    fn record_model_load(&self, model_name: &str, version: &str, elapsed: Duration);

    /// A classifier became active (one more resident model)
    fn model_activated(&self, model_name: &str, version: &str);

    /// A whole batch finished
    fn record_inference(&self, version: &str, elapsed: Duration);

    /// A cache lookup found a stored result
    fn record_cache_hit(&self, version: &str);

    /// A cache lookup found nothing (or the cache was unavailable)
    fn record_cache_miss(&self, version: &str);
}

/// Sink that drops every signal
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ObservabilitySink for NoopSink {
    fn record_model_load(&self, _model_name: &str, _version: &str, _elapsed: Duration) {}
    fn model_activated(&self, _model_name: &str, _version: &str) {}
    fn record_inference(&self, _version: &str, _elapsed: Duration) {}
    fn record_cache_hit(&self, _version: &str) {}
    fn record_cache_miss(&self, _version: &str) {}
}

/// Sink that forwards to the `metrics` facade
///
/// With a Prometheus recorder installed these become the exported series;
/// without one they are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusSink;

impl PrometheusSink {
    /// Register descriptions for every series this sink emits
    pub fn describe() {
        ::metrics::describe_gauge!(
            names::MODEL_LOAD_SECONDS,
            ::metrics::Unit::Seconds,
            "Time taken to load the model into memory"
        );
        ::metrics::describe_gauge!(names::ACTIVE_MODELS, "Number of models currently loaded");
        ::metrics::describe_histogram!(
            names::MODEL_INFERENCE_SECONDS,
            ::metrics::Unit::Seconds,
            "Time taken for model inference"
        );
        ::metrics::describe_counter!(names::CACHE_HITS, "Total number of cache hits");
        ::metrics::describe_counter!(names::CACHE_MISSES, "Total number of cache misses");
        ::metrics::describe_counter!(names::HTTP_REQUESTS, "Total number of HTTP requests");
        ::metrics::describe_histogram!(
            names::HTTP_REQUEST_DURATION,
            ::metrics::Unit::Seconds,
            "HTTP request latency in seconds"
        );
    }
}

impl ObservabilitySink for PrometheusSink {
    fn record_model_load(&self, model_name: &str, version: &str, elapsed: Duration) {
        ::metrics::gauge!(
            names::MODEL_LOAD_SECONDS,
            "model_name" => model_name.to_string(),
            "model_version" => version.to_string()
        )
        .set(elapsed.as_secs_f64());
    }

    fn model_activated(&self, model_name: &str, version: &str) {
        ::metrics::gauge!(
            names::ACTIVE_MODELS,
            "model_name" => model_name.to_string(),
            "version" => version.to_string()
        )
        .increment(1.0);
    }

    fn record_inference(&self, version: &str, elapsed: Duration) {
        ::metrics::histogram!(
            names::MODEL_INFERENCE_SECONDS,
            "model_name" => INFERENCE_MODEL_NAME,
            "model_version" => version.to_string()
        )
        .record(elapsed.as_secs_f64());
    }

    fn record_cache_hit(&self, version: &str) {
        ::metrics::counter!(names::CACHE_HITS, "model_version" => version.to_string()).increment(1);
    }

    fn record_cache_miss(&self, version: &str) {
        ::metrics::counter!(names::CACHE_MISSES, "model_version" => version.to_string())
            .increment(1);
    }
}
