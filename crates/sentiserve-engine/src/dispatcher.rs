//! Batch prediction dispatch

use sentiserve_cache::ResultCache;
use sentiserve_classifiers::{Classifier, ClassifierLoader, LabelTable, ModelRegistry};
use sentiserve_core::{
    Error, ModelDescriptor, PredictionItemResult, PredictionRequest, PredictionResponse,
};
use sentiserve_telemetry::ObservabilitySink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Where classifier invocations run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// On the calling task
    Inline,

    /// On the Tokio blocking pool, one task per text
    #[default]
    Blocking,
}

#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub execution: ExecutionMode,
}

/// Serves prediction requests against the registered models
pub struct Dispatcher {
    loader: Arc<ClassifierLoader>,
    cache: Option<Arc<ResultCache>>,
    labels: LabelTable,
    sink: Arc<dyn ObservabilitySink>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(loader: Arc<ClassifierLoader>, sink: Arc<dyn ObservabilitySink>) -> Self {
        Self {
            loader,
            cache: None,
            labels: LabelTable::default(),
            sink,
            config: DispatcherConfig::default(),
        }
    }

    /// Consult and populate a result cache for every text
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.loader.registry()
    }

    pub fn loader(&self) -> &Arc<ClassifierLoader> {
        &self.loader
    }

    /// Registered models in registration order
    pub fn list_models(&self) -> &[ModelDescriptor] {
        self.registry().list()
    }

    /// Classify every text of a request
    ///
    /// Always returns a response: per-item failures become `unknown` results
    /// in place, and a failure to load any classifier yields an empty,
    /// zero-latency response.
    pub async fn predict(&self, request: PredictionRequest) -> PredictionResponse {
        let start = Instant::now();
        let PredictionRequest {
            id,
            texts,
            model_version,
        } = request;

        let resolved = self
            .registry()
            .resolve(model_version.as_deref())
            .to_string();

        let model = match self.loader.get_or_load(&resolved).await {
            Ok(model) => model,
            Err(e) => {
                error!(
                    request_id = %id,
                    version = %resolved,
                    error = %e,
                    "No classifier available, returning degraded response"
                );
                return PredictionResponse::degraded(id, resolved);
            }
        };
        let version = model.version;

        let mut results = Vec::with_capacity(texts.len());
        let mut hits = 0usize;

        for text in texts {
            if let Some(cache) = &self.cache {
                if let Some(hit) = cache.get(&version, &text).await {
                    hits += 1;
                    results.push(hit);
                    continue;
                }
            }

            let item = self.classify(&model.classifier, text).await;

            if let Some(cache) = &self.cache {
                if !item.is_failure() {
                    cache
                        .set(&version, &item.text, &item, cache.default_ttl())
                        .await;
                }
            }
            results.push(item);
        }

        let elapsed = start.elapsed();
        self.sink.record_inference(&version, elapsed);

        let failures = results.iter().filter(|r| r.is_failure()).count();
        debug!(
            request_id = %id,
            version = %version,
            items = results.len(),
            failures,
            cache_hits = hits,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Prediction complete"
        );

        let cached = !results.is_empty() && hits == results.len();
        PredictionResponse {
            request_id: id,
            model_version: version,
            results,
            latency_ms: elapsed.as_secs_f64() * 1000.0,
            cached,
        }
    }

    async fn classify(&self, classifier: &Arc<dyn Classifier>, text: String) -> PredictionItemResult {
        let outcome = match self.config.execution {
            ExecutionMode::Inline => classifier.classify(&text),
            ExecutionMode::Blocking => {
                let classifier = Arc::clone(classifier);
                let input = text.clone();
                tokio::task::spawn_blocking(move || classifier.classify(&input))
                    .await
                    .unwrap_or_else(|e| {
                        Err(Error::internal(format!("classifier task failed: {e}")))
                    })
            }
        };

        match outcome {
            Ok(raw) if !raw.score.is_finite() => {
                warn!(
                    classifier = classifier.name(),
                    score = raw.score,
                    "Classifier returned a non-finite score"
                );
                PredictionItemResult::failed(text, format!("non-finite score {}", raw.score))
            }
            Ok(raw) => {
                let class = self.labels.canonicalize(&raw.label, raw.score).class();
                PredictionItemResult::classified(text, class, raw.score.clamp(0.0, 1.0), raw.label)
            }
            Err(e) => {
                warn!(classifier = classifier.name(), error = %e, "Item classification failed");
                PredictionItemResult::failed(text, e.to_string())
            }
        }
    }
}
