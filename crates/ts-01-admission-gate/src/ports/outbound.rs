//! # Outbound Ports (Driven Ports / SPI)
//!
//! The quota store: an external key-value store holding one hash per
//! origin, with a key-level TTL.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error from quota store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something unexpected.
    #[error("Store protocol error: {0}")]
    Protocol(String),
}

/// Hash-per-key store with key expiry.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Set (or refresh) the key's time to live. No-op for missing keys.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Number of fields under the key (0 when missing or expired).
    async fn len(&self, key: &str) -> Result<usize, StoreError>;

    /// All fields under the key.
    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Whether the field exists under the key.
    async fn contains(&self, key: &str, field: &str) -> Result<bool, StoreError>;

    /// Set one field, creating the key if needed.
    async fn set(&self, key: &str, field: &str, value: String) -> Result<(), StoreError>;

    /// Delete one field.
    async fn remove(&self, key: &str, field: &str) -> Result<(), StoreError>;
}
