//! Core types for Sentiserve

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static metadata for one registered model version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Unique version id (registry key)
    pub version: String,

    /// Human readable model name
    #[serde(rename = "name")]
    pub display_name: String,

    /// Opaque locator for the model weights
    #[serde(alias = "locator")]
    pub weight_locator: String,

    /// Free-form notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ModelDescriptor {
    /// Create a new descriptor without notes
    pub fn new(
        version: impl Into<String>,
        display_name: impl Into<String>,
        weight_locator: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            display_name: display_name.into(),
            weight_locator: weight_locator.into(),
            notes: None,
        }
    }

    /// Attach notes to the descriptor
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Canonical sentiment class of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentClass {
    Positive,
    Negative,
    Unknown,
}

impl SentimentClass {
    /// Numeric label for the class (1 for positive, 0 otherwise)
    pub fn label(self) -> u8 {
        match self {
            Self::Positive => 1,
            Self::Negative | Self::Unknown => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SentimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Caller supplied request id
    pub id: String,

    /// Texts to classify, in order
    pub texts: Vec<String>,

    /// Optional model version override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
}

impl PredictionRequest {
    /// Create a request against the default model version
    pub fn new<I, S>(id: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            texts: texts.into_iter().map(Into::into).collect(),
            model_version: None,
        }
    }

    /// Request a specific model version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }
}

/// Result for a single input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionItemResult {
    /// The input text
    pub text: String,

    /// Numeric label (1 positive, 0 negative or unknown)
    pub label: u8,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,

    /// Canonical class
    pub class: SentimentClass,

    /// Label as reported by the classifier, absent on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,

    /// Failure description, present only on per-item failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionItemResult {
    /// Build a successful result
    pub fn classified(
        text: impl Into<String>,
        class: SentimentClass,
        confidence: f32,
        raw_label: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            label: class.label(),
            confidence,
            class,
            raw_label: Some(raw_label.into()),
            error: None,
        }
    }

    /// Build the placeholder result for an item whose classification failed
    pub fn failed(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: 0,
            confidence: 0.0,
            class: SentimentClass::Unknown,
            raw_label: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Response to a batch prediction request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Id of the originating request
    pub request_id: String,

    /// Registry version that served the request
    pub model_version: String,

    /// One result per input text, in request order
    pub results: Vec<PredictionItemResult>,

    /// Wall-clock latency of the whole batch in milliseconds
    pub latency_ms: f64,

    /// True only if every result came from the cache
    #[serde(default)]
    pub cached: bool,
}

impl PredictionResponse {
    /// Empty, zero-latency response returned instead of a fatal failure
    pub fn degraded(request_id: impl Into<String>, model_version: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            model_version: model_version.into(),
            results: Vec::new(),
            latency_ms: 0.0,
            cached: false,
        }
    }
}
