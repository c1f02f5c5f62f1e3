//! Lazy, once-per-version classifier loading
//!
//! The first request for a version materializes its classifier through the
//! [`WeightLoader`]; every later request gets the same instance. Loaded
//! classifiers are kept for the lifetime of the loader.

use crate::classifier::Classifier;
use crate::registry::ModelRegistry;
use crate::weight_loader::WeightLoader;
use sentiserve_core::{Error, Result};
use sentiserve_telemetry::ObservabilitySink;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info, warn};

type Slot = Arc<OnceCell<Arc<dyn Classifier>>>;

/// A classifier together with the version that actually provides it
///
/// `version` differs from the requested one when loading fell back to the
/// default version.
#[derive(Clone)]
pub struct LoadedModel {
    pub version: String,
    pub classifier: Arc<dyn Classifier>,
}

/// Owns every materialized classifier
pub struct ClassifierLoader {
    registry: Arc<ModelRegistry>,
    weight_loader: Arc<dyn WeightLoader>,
    sink: Arc<dyn ObservabilitySink>,

    /// One once-cell per version that has been requested at least once
    slots: RwLock<HashMap<String, Slot>>,
}

impl ClassifierLoader {
    pub fn new(
        registry: Arc<ModelRegistry>,
        weight_loader: Arc<dyn WeightLoader>,
        sink: Arc<dyn ObservabilitySink>,
    ) -> Self {
        Self {
            registry,
            weight_loader,
            sink,
            slots: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Get the classifier for a registered version, loading it on first use
    ///
    /// If a non-default version fails to load, the default version's
    /// classifier is returned instead. A failure to load the default version
    /// is returned to the caller.
    pub async fn get_or_load(&self, version: &str) -> Result<LoadedModel> {
        match self.load_version(version).await {
            Ok(classifier) => Ok(LoadedModel {
                version: version.to_string(),
                classifier,
            }),
            Err(e) if !self.registry.is_default(version) => {
                let default_version = self.registry.default_version();
                warn!(
                    version,
                    default_version,
                    error = %e,
                    "Model load failed, falling back to default version"
                );

                // The default version never falls back any further.
                let classifier = self.load_version(default_version).await.map_err(|e| {
                    error!(version = default_version, error = %e, "Default model load failed");
                    e
                })?;

                Ok(LoadedModel {
                    version: default_version.to_string(),
                    classifier,
                })
            }
            Err(e) => {
                error!(version, error = %e, "Default model load failed");
                Err(e)
            }
        }
    }

    async fn load_version(&self, version: &str) -> Result<Arc<dyn Classifier>> {
        // Fast path: already materialized.
        if let Some(classifier) = self
            .slots
            .read()
            .await
            .get(version)
            .and_then(|slot| slot.get().cloned())
        {
            return Ok(classifier);
        }

        let slot = {
            let mut slots = self.slots.write().await;
            Arc::clone(slots.entry(version.to_string()).or_default())
        };

        // Construction runs in its own task so a cancelled caller cannot
        // abandon a build half way. Concurrent first callers wait on the same
        // cell; only one constructs.
        let task = {
            let registry = Arc::clone(&self.registry);
            let weight_loader = Arc::clone(&self.weight_loader);
            let sink = Arc::clone(&self.sink);
            let version = version.to_string();
            tokio::spawn(async move {
                slot.get_or_try_init(|| {
                    construct(&registry, weight_loader.as_ref(), sink.as_ref(), &version)
                })
                .await
                .cloned()
            })
        };

        task.await
            .map_err(|e| Error::load(version, format!("load task failed: {e}")))?
    }

    /// Eagerly load the given versions
    pub async fn preload(&self, versions: &[String]) -> Result<()> {
        for version in versions {
            let loaded = self.get_or_load(version).await?;
            if loaded.version != *version {
                warn!(
                    requested = %version,
                    served_by = %loaded.version,
                    "Preload fell back to default version"
                );
            }
        }
        Ok(())
    }

    /// Check if a version's classifier is materialized
    pub async fn is_loaded(&self, version: &str) -> bool {
        self.slots
            .read()
            .await
            .get(version)
            .map_or(false, |slot| slot.initialized())
    }

    /// Versions with a materialized classifier, in registration order
    pub async fn loaded_versions(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        self.registry
            .list()
            .iter()
            .filter(|d| slots.get(&d.version).map_or(false, |slot| slot.initialized()))
            .map(|d| d.version.clone())
            .collect()
    }
}

/// Build one version's classifier and report the load
async fn construct(
    registry: &ModelRegistry,
    weight_loader: &dyn WeightLoader,
    sink: &dyn ObservabilitySink,
    version: &str,
) -> Result<Arc<dyn Classifier>> {
    let descriptor = registry
        .get(version)
        .ok_or_else(|| Error::load(version, "not a registered version"))?;

    info!(
        version,
        locator = %descriptor.weight_locator,
        "Loading model"
    );
    let start = Instant::now();

    let classifier = weight_loader
        .load(descriptor)
        .await
        .map_err(|e| Error::load(version, e.to_string()))?;

    let elapsed = start.elapsed();
    sink.record_model_load(&descriptor.display_name, version, elapsed);
    sink.model_activated(&descriptor.display_name, version);

    info!(
        version,
        model = %descriptor.display_name,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "Model loaded"
    );

    Ok(classifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight_loader::RuntimeLoader;
    use sentiserve_core::ModelDescriptor;
    use sentiserve_telemetry::MetricsCollector;

    fn loader(metrics: &MetricsCollector) -> ClassifierLoader {
        let registry = ModelRegistry::new(
            vec![
                ModelDescriptor::new("v1", "Lexicon", "builtin:lexicon"),
                ModelDescriptor::new("v9", "Broken", "builtin:missing"),
            ],
            None,
        )
        .unwrap();

        ClassifierLoader::new(
            Arc::new(registry),
            Arc::new(RuntimeLoader::new()),
            Arc::new(metrics.clone()),
        )
    }

    #[tokio::test]
    async fn test_second_call_returns_same_instance() {
        let metrics = MetricsCollector::new();
        let loader = loader(&metrics);

        let first = loader.get_or_load("v1").await.unwrap();
        let second = loader.get_or_load("v1").await.unwrap();

        assert!(Arc::ptr_eq(&first.classifier, &second.classifier));
        assert_eq!(metrics.snapshot().models_loaded, 1);
        assert_eq!(metrics.active_models("v1"), 1);
    }

    #[tokio::test]
    async fn test_failed_version_falls_back_to_default() {
        let metrics = MetricsCollector::new();
        let loader = loader(&metrics);

        let loaded = loader.get_or_load("v9").await.unwrap();

        assert_eq!(loaded.version, "v1");
        assert!(!loader.is_loaded("v9").await);
        assert_eq!(loader.loaded_versions().await, vec!["v1"]);
    }

    #[tokio::test]
    async fn test_preload() {
        let metrics = MetricsCollector::new();
        let loader = loader(&metrics);

        loader.preload(&["v1".to_string()]).await.unwrap();
        assert!(loader.is_loaded("v1").await);
    }
}
