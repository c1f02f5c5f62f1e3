//! The weight-loading primitive
//!
//! Turns a descriptor's locator into a callable classifier. The lazy loader
//! calls it at most once per version (per successful load).

use crate::classifier::Classifier;
use crate::locator::WeightLocator;
use crate::sentiment::SentimentClassifier;
#[cfg(feature = "ml-models")]
use crate::transformer::TransformerOptions;
use sentiserve_core::{ModelDescriptor, Result};
use std::sync::Arc;

/// Pluggable backend that materializes classifiers from weights.
///
/// Implement this trait to provide other inference runtimes (ONNX, remote
/// model servers, test doubles) without touching the loader or dispatcher.
#[async_trait::async_trait]
pub trait WeightLoader: Send + Sync {
    /// Build a classifier for the descriptor's weight locator
    async fn load(&self, descriptor: &ModelDescriptor) -> Result<Arc<dyn Classifier>>;
}

/// Loader for the locators this crate understands
///
/// `builtin:lexicon` is always available. Local and Hugging Face model
/// directories need the `ml-models` feature.
#[derive(Debug, Clone, Default)]
pub struct RuntimeLoader {
    #[cfg(feature = "ml-models")]
    options: TransformerOptions,
}

impl RuntimeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override transformer inference options
    #[cfg(feature = "ml-models")]
    pub fn with_options(mut self, options: TransformerOptions) -> Self {
        self.options = options;
        self
    }

    fn load_builtin(
        descriptor: &ModelDescriptor,
        implementation: &str,
    ) -> Result<Arc<dyn Classifier>> {
        match implementation {
            "lexicon" => Ok(Arc::new(SentimentClassifier::with_name(
                descriptor.display_name.clone(),
            )?)),
            other => Err(sentiserve_core::Error::classifier(format!(
                "Unknown builtin classifier '{other}'"
            ))),
        }
    }

    #[cfg(feature = "ml-models")]
    async fn load_transformer(
        &self,
        descriptor: &ModelDescriptor,
        locator: WeightLocator,
    ) -> Result<Arc<dyn Classifier>> {
        let name = descriptor.display_name.clone();
        let options = self.options.clone();

        let classifier = tokio::task::spawn_blocking(move || {
            crate::transformer::load(&name, &locator, &options)
        })
        .await
        .map_err(|e| {
            sentiserve_core::Error::internal(format!("Model loading task failed: {e}"))
        })??;

        Ok(Arc::new(classifier))
    }

    #[cfg(not(feature = "ml-models"))]
    async fn load_transformer(
        &self,
        _descriptor: &ModelDescriptor,
        locator: WeightLocator,
    ) -> Result<Arc<dyn Classifier>> {
        Err(sentiserve_core::Error::classifier(format!(
            "Loading '{locator}' requires the 'ml-models' feature"
        )))
    }
}

#[async_trait::async_trait]
impl WeightLoader for RuntimeLoader {
    async fn load(&self, descriptor: &ModelDescriptor) -> Result<Arc<dyn Classifier>> {
        match WeightLocator::parse(&descriptor.weight_locator) {
            WeightLocator::Builtin { implementation } => {
                Self::load_builtin(descriptor, &implementation)
            }
            locator => self.load_transformer(descriptor, locator).await,
        }
    }
}
