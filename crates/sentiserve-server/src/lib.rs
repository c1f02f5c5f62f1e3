//! Sentiserve Server
//!
//! Thin HTTP surface over the inference dispatcher: model listing, batch
//! prediction behind a token check, health and Prometheus metrics.

pub mod config;
pub mod routes;
pub mod security;
pub mod state;

pub use config::{LogFormat, ServerConfig};
pub use routes::create_router;
pub use state::AppState;
