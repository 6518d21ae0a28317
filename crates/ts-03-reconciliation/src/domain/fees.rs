//! # Fee Maths

use primitive_types::U256;

use crate::config::ReconcileConfig;

/// Gas and fee amounts derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub gas_price: U256,
    pub fee: U256,
    pub purchase_gas_limit: u64,
    pub fee_gas_limit: u64,
}

impl FeeSchedule {
    /// Schedule from configuration.
    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self {
            gas_price: config.gas_price,
            fee: config.fee,
            purchase_gas_limit: config.purchase_gas_limit,
            fee_gas_limit: config.fee_gas_limit,
        }
    }

    /// Maximum gas cost of the purchase transaction.
    pub fn total_gas(&self) -> U256 {
        self.gas_price
            .saturating_mul(U256::from(self.purchase_gas_limit))
    }

    /// Maximum gas cost of the fee payment transaction.
    pub fn tx_fee(&self) -> U256 {
        self.gas_price.saturating_mul(U256::from(self.fee_gas_limit))
    }

    /// Fee plus the gas to pay it.
    pub fn total_fee(&self) -> U256 {
        self.fee.saturating_add(self.tx_fee())
    }
}

/// Wei still needed before the purchase can go ahead.
///
/// `max(0, spending + total_gas + (total_fee if unpaid) - balance)`
pub fn missing_wei(
    spending: U256,
    balance: U256,
    fee_paid: bool,
    schedule: &FeeSchedule,
) -> U256 {
    let mut needed = spending.saturating_add(schedule.total_gas());
    if !fee_paid {
        needed = needed.saturating_add(schedule.total_fee());
    }
    needed.saturating_sub(balance)
}
