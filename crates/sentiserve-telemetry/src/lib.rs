//! Sentiserve Telemetry
//!
//! Observability for the inference core.
//!
//! Provides:
//! - The `ObservabilitySink` trait the core reports into
//! - A sink backed by the `metrics` facade (Prometheus series)
//! - An in-memory collector for tests and health reporting

pub mod metrics;
pub mod sink;

pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use sink::{NoopSink, ObservabilitySink, PrometheusSink};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::MetricsCollector;
    pub use crate::sink::{NoopSink, ObservabilitySink, PrometheusSink};
}
