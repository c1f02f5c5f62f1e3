//! Shared application state

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use sentiserve_cache::ResultCache;
use sentiserve_classifiers::{ClassifierLoader, ModelRegistry, RuntimeLoader};
use sentiserve_engine::Dispatcher;
use sentiserve_telemetry::{ObservabilitySink, PrometheusSink};
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config: Arc<ServerConfig>,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the serving stack described by the configuration
    pub async fn new(
        config: ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let registry = match &config.registry {
            Some(path) => ModelRegistry::from_file(path)
                .with_context(|| format!("Failed to load model registry {}", path.display()))?,
            None => {
                info!("No model registry configured, using the built-in lexicon model");
                ModelRegistry::default()
            }
        };

        let sink: Arc<dyn ObservabilitySink> = Arc::new(PrometheusSink);
        let loader = ClassifierLoader::new(
            Arc::new(registry),
            Arc::new(RuntimeLoader::new()),
            sink.clone(),
        );

        if !config.preload.is_empty() {
            loader
                .preload(&config.preload)
                .await
                .context("Failed to preload models")?;
            info!(versions = ?config.preload, "Models preloaded");
        }

        let mut dispatcher = Dispatcher::new(Arc::new(loader), sink.clone())
            .with_config(config.dispatcher_config());

        if let Some(url) = &config.redis_url {
            let cache = ResultCache::connect(url, sink, config.cache_config()).await;
            dispatcher = dispatcher.with_cache(Arc::new(cache));
        }

        Ok(Self::from_parts(dispatcher, config, metrics_handle))
    }

    /// Assemble state around an existing dispatcher
    pub fn from_parts(
        dispatcher: Dispatcher,
        config: ServerConfig,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
            metrics_handle,
        }
    }
}
