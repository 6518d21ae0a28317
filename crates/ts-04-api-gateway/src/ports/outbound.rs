//! # Outbound Ports

use async_trait::async_trait;
use shared_types::Address;
use thiserror::Error;

/// Registration persistence errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// The store cannot be reached.
    #[error("Registration store unavailable: {0}")]
    Unavailable(String),
}

/// Record of admitted addresses.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Record that `address` registered from `origin`. Idempotent.
    async fn register(&self, address: &Address, origin: &str) -> Result<(), RegistrationError>;

    /// Whether `address` has registered.
    async fn is_registered(&self, address: &Address) -> Result<bool, RegistrationError>;
}
