//! Error types for Sentiserve

/// Result type alias using Sentiserve's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Sentiserve operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Classifier invocation errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// A classifier could not be materialized for a version
    #[error("failed to load model version '{version}': {reason}")]
    Load { version: String, reason: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Cache backend errors
    #[error("cache error: {0}")]
    Cache(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new load error for a model version
    pub fn load(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new cache error
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
