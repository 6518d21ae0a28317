//! # Reconciliation Configuration

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Gas price used for every transaction, in wei.
    pub gas_price: U256,
    /// Certification fee charged by the fee registrar, in wei.
    pub fee: U256,
    /// Gas limit of the purchase transaction.
    pub purchase_gas_limit: u64,
    /// Gas limit of the fee registrar `pay` transaction.
    pub fee_gas_limit: u64,
    /// Consecutive evaluation failures before the workflow is told.
    pub failure_bound: u32,
    /// Deadline for each chain read.
    pub call_timeout_ms: u64,
    /// Seconds before the sale ends during which uncertified contributors
    /// are turned away.
    pub late_window_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            gas_price: U256::zero(),
            fee: U256::zero(),
            purchase_gas_limit: 200_000,
            fee_gas_limit: 0x30d40,
            failure_bound: 10,
            call_timeout_ms: 10_000,
            late_window_secs: 3_600,
        }
    }
}

impl ReconcileConfig {
    /// Chain read deadline.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_bound == 0 {
            return Err("failure_bound cannot be 0".into());
        }
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms cannot be 0".into());
        }
        if self.purchase_gas_limit == 0 || self.fee_gas_limit == 0 {
            return Err("gas limits cannot be 0".into());
        }
        Ok(())
    }
}
