//! Static registry of model versions

use crate::config::RegistryConfig;
use sentiserve_core::{Error, ModelDescriptor, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Immutable mapping of version id to model descriptor
///
/// Always holds at least one model, and the default version is always one of
/// them, so version resolution cannot fail.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    /// Descriptors in registration order
    descriptors: Vec<ModelDescriptor>,

    /// Version id to position in `descriptors`
    index: HashMap<String, usize>,

    default_version: String,
}

impl ModelRegistry {
    /// Build a registry from descriptors
    ///
    /// When `default_version` is `None` the first descriptor is the default.
    pub fn new(descriptors: Vec<ModelDescriptor>, default_version: Option<String>) -> Result<Self> {
        let first = descriptors
            .first()
            .ok_or_else(|| Error::config("Model registry must contain at least one model"))?;
        let default_version = default_version.unwrap_or_else(|| first.version.clone());

        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            if descriptor.version.trim().is_empty() {
                return Err(Error::config("Model version must not be empty"));
            }
            if index.insert(descriptor.version.clone(), position).is_some() {
                return Err(Error::config(format!(
                    "Duplicate model version '{}'",
                    descriptor.version
                )));
            }
        }

        if !index.contains_key(&default_version) {
            return Err(Error::config(format!(
                "Default version '{}' is not a registered model",
                default_version
            )));
        }

        info!(
            models = descriptors.len(),
            default_version = %default_version,
            "Model registry initialized"
        );

        Ok(Self {
            descriptors,
            index,
            default_version,
        })
    }

    /// Build a registry from its configuration
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        Self::new(config.models, config.default_version)
    }

    /// Load registry from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_config(RegistryConfig::from_file(path)?)
    }

    /// Normalize a requested version to a registered one
    ///
    /// Unknown or absent versions resolve to the default; this is never an error.
    pub fn resolve(&self, requested: Option<&str>) -> &str {
        match requested {
            Some(version) => match self.index.get(version) {
                Some(&position) => self.descriptors[position].version.as_str(),
                None => {
                    debug!(
                        requested = version,
                        default_version = %self.default_version,
                        "Unknown model version, using default"
                    );
                    self.default_version.as_str()
                }
            },
            None => self.default_version.as_str(),
        }
    }

    /// Get a descriptor by version
    pub fn get(&self, version: &str) -> Option<&ModelDescriptor> {
        self.index
            .get(version)
            .map(|&position| &self.descriptors[position])
    }

    /// Check if a version is registered
    pub fn contains(&self, version: &str) -> bool {
        self.index.contains_key(version)
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn default_descriptor(&self) -> &ModelDescriptor {
        &self.descriptors[self.index[&self.default_version]]
    }

    pub fn is_default(&self, version: &str) -> bool {
        self.default_version == version
    }

    /// All descriptors in registration order
    pub fn list(&self) -> &[ModelDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let config = RegistryConfig::default();
        let descriptors = config.models;
        let default_version = descriptors[0].version.clone();
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(position, d)| (d.version.clone(), position))
            .collect();

        Self {
            descriptors,
            index,
            default_version,
        }
    }
}
