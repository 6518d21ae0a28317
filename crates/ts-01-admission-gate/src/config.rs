//! # Quota Configuration
//!
//! Tunable limits for the per-origin address quota.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of distinct addresses one origin may use.
pub const DEFAULT_MAX_ADDRESSES: usize = 20;

/// Default lifetime of an address entry (24 hours).
pub const DEFAULT_TTL_MS: u64 = 24 * 3600 * 1000;

/// Quota configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum distinct addresses on file per origin.
    pub max_addresses_per_origin: usize,
    /// Entry lifetime, also used as the store key TTL.
    pub ttl_ms: u64,
    /// Upper bound for one check-and-update against the store.
    pub store_timeout_ms: u64,
    /// Prefix of the per-origin store key.
    pub key_prefix: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_addresses_per_origin: DEFAULT_MAX_ADDRESSES,
            ttl_ms: DEFAULT_TTL_MS,
            store_timeout_ms: 2_000,
            key_prefix: "rate-limiter::".to_string(),
        }
    }
}

impl QuotaConfig {
    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Store call timeout.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Store key for an origin.
    pub fn origin_key(&self, origin: &str) -> String {
        format!("{}{}", self.key_prefix, origin)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_addresses_per_origin == 0 {
            return Err("max_addresses_per_origin cannot be 0".into());
        }
        if self.ttl_ms == 0 {
            return Err("ttl_ms cannot be 0".into());
        }
        if self.store_timeout_ms == 0 {
            return Err("store_timeout_ms cannot be 0".into());
        }
        Ok(())
    }
}
