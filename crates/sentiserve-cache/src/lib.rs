//! Sentiserve Cache
//!
//! Per-text prediction cache fronting classifier invocation.
//!
//! The cache is strictly an optimization: every backend failure turns into
//! a miss on read and a no-op on write, so it can never fail a request.

pub mod result_cache;
pub mod store;

pub use result_cache::{CacheConfig, ResultCache};
pub use store::{KeyValueStore, MemoryStore, RedisStore};
