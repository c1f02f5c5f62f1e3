//! Sentiserve Engine
//!
//! The inference dispatcher: resolves the model version, obtains the loaded
//! classifier, runs every text in a batch with per-item fault isolation and
//! assembles a well-formed response. It never returns an error.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, DispatcherConfig, ExecutionMode};
