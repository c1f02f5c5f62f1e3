//! Sentiserve Classifiers
//!
//! Everything between a model version id and a callable classifier.
//!
//! - [`ModelRegistry`]: the immutable catalogue of model versions
//! - [`ClassifierLoader`]: lazy, at-most-once materialization of classifiers
//! - [`WeightLoader`]: the pluggable weight-loading primitive
//! - [`LabelTable`]: canonicalization of raw labels into sentiment classes
//!
//! The keyword lexicon classifier is always available. Transformer models
//! (BERT and DistilBERT sequence classifiers) need the `ml-models` feature.

pub mod classifier;
pub mod config;
pub mod labels;
pub mod locator;
pub mod model_loader;
pub mod registry;
pub mod sentiment;
#[cfg(feature = "ml-models")]
pub mod transformer;
pub mod weight_loader;

pub use classifier::{ClassificationMetadata, ClassificationResult, Classifier};
pub use config::{RegistryConfig, BUILTIN_LEXICON_LOCATOR};
pub use labels::{Canonicalized, LabelTable, POSITIVE_THRESHOLD};
pub use locator::WeightLocator;
pub use model_loader::{ClassifierLoader, LoadedModel};
pub use registry::ModelRegistry;
pub use sentiment::SentimentClassifier;
#[cfg(feature = "ml-models")]
pub use transformer::{TransformerClassifier, TransformerOptions};
pub use weight_loader::{RuntimeLoader, WeightLoader};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::labels::LabelTable;
    pub use crate::model_loader::{ClassifierLoader, LoadedModel};
    pub use crate::registry::ModelRegistry;
    pub use crate::sentiment::SentimentClassifier;
    pub use crate::weight_loader::{RuntimeLoader, WeightLoader};
}
