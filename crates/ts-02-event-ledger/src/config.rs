//! # Ledger Configuration

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockNumber};
use std::time::Duration;

/// Ledger service configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Sale contract whose events are aggregated.
    pub contract: Address,
    /// First block to scan on bootstrap (the sale deployment block).
    pub from_block: BlockNumber,
    /// Deadline for each chain call (log fetch, timestamp batch).
    pub lookup_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            contract: [0u8; 20],
            from_block: 0,
            lookup_timeout_ms: 10_000,
        }
    }
}

impl LedgerConfig {
    /// Chain call deadline.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.lookup_timeout_ms == 0 {
            return Err("lookup_timeout_ms cannot be 0".into());
        }
        Ok(())
    }
}
