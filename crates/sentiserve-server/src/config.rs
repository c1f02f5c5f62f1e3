//! Server configuration

use anyhow::{bail, Context};
use sentiserve_cache::CacheConfig;
use sentiserve_engine::{DispatcherConfig, ExecutionMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "SENTISERVE";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
///
/// Layered as defaults, then the YAML file, then `SENTISERVE__*` environment
/// variables (e.g. `SENTISERVE__REDIS_URL`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub listen: String,

    /// Listen port
    pub port: u16,

    /// Prefix of the versioned API routes
    pub api_prefix: String,

    /// Value the `x-token` header must carry on prediction requests
    pub auth_token: String,

    /// Redis URL for the result cache; the cache is disabled when unset
    pub redis_url: Option<String>,

    pub cache_ttl_secs: u64,

    pub cache_timeout_ms: u64,

    /// Where classifier invocations run
    pub execution: ExecutionMode,

    /// Largest accepted batch
    pub max_batch_size: usize,

    pub log_format: LogFormat,

    /// Versions loaded at startup instead of on first request
    pub preload: Vec<String>,

    /// Model registry YAML; the built-in registry is used when unset
    pub registry: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            port: 8000,
            api_prefix: "/api/v1".to_string(),
            auth_token: "secret-token".to_string(),
            redis_url: None,
            cache_ttl_secs: 3600,
            cache_timeout_ms: 250,
            execution: ExecutionMode::default(),
            max_batch_size: 64,
            log_format: LogFormat::default(),
            preload: Vec::new(),
            registry: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("preload"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {config_path}"))?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_prefix.starts_with('/') || self.api_prefix.len() < 2 {
            bail!(
                "api_prefix must start with '/' and not be the root, got '{}'",
                self.api_prefix
            );
        }
        if self.api_prefix.ends_with('/') {
            bail!("api_prefix must not end with '/', got '{}'", self.api_prefix);
        }
        if self.max_batch_size == 0 {
            bail!("max_batch_size must be at least 1");
        }
        if self.auth_token.is_empty() {
            bail!("auth_token must not be empty");
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            timeout: Duration::from_millis(self.cache_timeout_ms),
            ..CacheConfig::default()
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            execution: self.execution,
        }
    }
}
