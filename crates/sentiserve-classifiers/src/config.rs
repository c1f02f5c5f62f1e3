//! Model registry configuration

use sentiserve_core::ModelDescriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Locator of the classifier every build can load
pub const BUILTIN_LEXICON_LOCATOR: &str = "builtin:lexicon";

/// Registry configuration as read from YAML
///
/// ```yaml
/// default_version: v1
/// models:
///   - version: v1
///     name: Lexicon baseline
///     weight_locator: "builtin:lexicon"
///   - version: v2
///     name: DistilBERT SST-2
///     weight_locator: "hf:distilbert-base-uncased-finetuned-sst-2-english"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Version used for unknown or absent requests; the first model when unset
    #[serde(default)]
    pub default_version: Option<String>,

    /// Registered models, oldest first
    #[serde(default)]
    pub models: Vec<ModelDescriptor>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_version: Some("v1".to_string()),
            models: vec![ModelDescriptor::new(
                "v1",
                "Lexicon baseline",
                BUILTIN_LEXICON_LOCATOR,
            )
            .with_notes("Keyword lexicon, needs no weights")],
        }
    }
}

impl RegistryConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> sentiserve_core::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| {
            sentiserve_core::Error::config(format!(
                "Failed to parse model registry {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Get all model versions in registration order
    pub fn versions(&self) -> Vec<String> {
        self.models.iter().map(|m| m.version.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_config_yaml() {
        let yaml = r#"
default_version: v2
models:
  - version: v1
    name: Lexicon baseline
    weight_locator: "builtin:lexicon"
  - version: v2
    name: DistilBERT SST-2
    locator: "hf:distilbert-base-uncased-finetuned-sst-2-english"
    notes: English movie reviews
"#;

        let config = RegistryConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.versions(), vec!["v1", "v2"]);
        assert_eq!(config.default_version.as_deref(), Some("v2"));
        assert_eq!(
            config.models[1].notes.as_deref(),
            Some("English movie reviews")
        );
    }

    #[test]
    fn test_default_version_is_optional() {
        let yaml = r#"
models:
  - version: a
    name: A
    weight_locator: "builtin:lexicon"
"#;
        let config = RegistryConfig::from_yaml(yaml).unwrap();
        assert!(config.default_version.is_none());
    }

    #[test]
    fn test_default_config_is_loadable_everywhere() {
        let config = RegistryConfig::default();
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].weight_locator, BUILTIN_LEXICON_LOCATOR);
    }
}
