//! # In-Memory Registration Store

use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::Address;
use tracing::debug;

use crate::ports::outbound::{RegistrationError, RegistrationStore};

/// Registrations kept in a concurrent map, keyed by address.
///
/// Each address keeps the origin of its first registration.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    origins: DashMap<Address, String>,
}

impl InMemoryRegistrationStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered addresses.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Origin `address` first registered from.
    pub fn origin_of(&self, address: &Address) -> Option<String> {
        self.origins.get(address).map(|o| o.value().clone())
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn register(&self, address: &Address, origin: &str) -> Result<(), RegistrationError> {
        self.origins.entry(*address).or_insert_with(|| {
            debug!(origin, "New registration");
            origin.to_string()
        });
        Ok(())
    }

    async fn is_registered(&self, address: &Address) -> Result<bool, RegistrationError> {
        Ok(self.origins.contains_key(address))
    }
}
