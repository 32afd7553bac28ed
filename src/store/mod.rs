//! Ephemeral key-value store abstraction.
//!
//! All cross-request state (sessions, revocations, rate-limit counters)
//! lives behind this interface. Every record carries a per-key TTL and
//! self-expires; nothing in the gateway runs an explicit sweep.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Uniform async get / put-with-TTL / delete surface over an external
/// key-value cache. Injected everywhere as `Arc<dyn EphemeralStore>`;
/// there are no process-wide store singletons.
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Fetch a value; `None` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value that expires `ttl` from now, replacing any previous
    /// value (and its deadline) for the key.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
