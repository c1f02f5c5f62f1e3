//! Sentiserve Core
//!
//! Core types and error handling shared across Sentiserve components.
//!
//! This crate provides:
//! - Model descriptors and the request/response shapes of the prediction API
//! - The canonical sentiment classes
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    ModelDescriptor, PredictionItemResult, PredictionRequest, PredictionResponse, SentimentClass,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ModelDescriptor, PredictionItemResult, PredictionRequest, PredictionResponse,
        SentimentClass,
    };
}
