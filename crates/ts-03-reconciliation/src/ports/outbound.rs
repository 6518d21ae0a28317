//! # Outbound Ports
//!
//! Dependencies the reconciler drives. Recording implementations are
//! provided for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use shared_types::{Address, AddressState, ChainError, TxHash, TxStatus};

use crate::domain::entities::Step;
use crate::domain::errors::ReconcileError;

/// Authoritative account and transaction state.
#[async_trait]
pub trait AccountReader: Send + Sync {
    /// Balance, certification, fee payment and accounted total of `address`.
    async fn get_address_state(&self, address: &Address) -> Result<AddressState, ChainError>;

    /// Receipt status of `hash`.
    async fn tx_status(&self, hash: &TxHash) -> Result<TxStatus, ChainError>;
}

/// Transaction broadcast. Signing and ABI encoding live behind this port.
#[async_trait]
pub trait SaleActions: Send + Sync {
    /// Send `spending` wei to the sale contract on behalf of `address`.
    async fn purchase(&self, address: &Address, spending: U256) -> Result<TxHash, ReconcileError>;

    /// Pay the certification fee for `address`.
    async fn pay_fee(&self, address: &Address) -> Result<TxHash, ReconcileError>;
}

/// Workflow navigation and error surface.
pub trait Workflow: Send + Sync {
    /// Step currently shown.
    fn current_step(&self) -> Step;

    /// Navigate to `step`.
    fn goto(&self, step: Step);

    /// Surface an error to the user.
    fn report_error(&self, error: &ReconcileError);
}

// =============================================================================
// TEST DOUBLES
// =============================================================================

/// Scriptable [`AccountReader`].
#[derive(Default)]
pub struct MockAccountReader {
    state: RwLock<AddressState>,
    receipts: RwLock<HashMap<TxHash, TxStatus>>,
    failures_left: AtomicUsize,
    state_reads: AtomicUsize,
    status_reads: AtomicUsize,
}

impl MockAccountReader {
    /// Reader reporting a default (empty, uncertified) account.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the reported account state.
    pub fn set_state(&self, state: AddressState) {
        *self.state.write() = state;
    }

    /// Update the reported account state in place.
    pub fn update_state(&self, f: impl FnOnce(&mut AddressState)) {
        f(&mut self.state.write());
    }

    /// Report `status` for `hash`.
    pub fn set_receipt(&self, hash: TxHash, status: TxStatus) {
        self.receipts.write().insert(hash, status);
    }

    /// Fail the next `count` reads with a transient error.
    pub fn fail_next(&self, count: usize) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Number of `get_address_state` calls.
    pub fn state_reads(&self) -> usize {
        self.state_reads.load(Ordering::SeqCst)
    }

    /// Number of `tx_status` calls.
    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    fn take_failure(&self) -> Result<(), ChainError> {
        let took = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took {
            Err(ChainError::Unavailable("node unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountReader for MockAccountReader {
    async fn get_address_state(&self, _address: &Address) -> Result<AddressState, ChainError> {
        self.state_reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(*self.state.read())
    }

    async fn tx_status(&self, hash: &TxHash) -> Result<TxStatus, ChainError> {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        Ok(self
            .receipts
            .read()
            .get(hash)
            .copied()
            .unwrap_or(TxStatus::Unknown))
    }
}

/// [`SaleActions`] that records calls and hands out sequential hashes.
#[derive(Default)]
pub struct RecordingActions {
    purchases: Mutex<Vec<(Address, U256)>>,
    fee_payments: Mutex<Vec<Address>>,
    fail: RwLock<bool>,
}

impl RecordingActions {
    /// Recorder that accepts every transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every broadcast fail.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.write() = fail;
    }

    /// Purchases sent so far.
    pub fn purchases(&self) -> Vec<(Address, U256)> {
        self.purchases.lock().clone()
    }

    /// Fee payments sent so far.
    pub fn fee_payments(&self) -> Vec<Address> {
        self.fee_payments.lock().clone()
    }

    /// Hash the recorder assigns to its `n`th transaction (1-based).
    pub fn tx_hash(n: usize) -> TxHash {
        let mut hash = [0u8; 32];
        hash[24..].copy_from_slice(&(n as u64).to_be_bytes());
        hash
    }

    fn check(&self) -> Result<(), ReconcileError> {
        if *self.fail.read() {
            Err(ReconcileError::Transaction("insufficient funds for gas".into()))
        } else {
            Ok(())
        }
    }

    fn sent(&self) -> usize {
        self.purchases.lock().len() + self.fee_payments.lock().len()
    }
}

#[async_trait]
impl SaleActions for RecordingActions {
    async fn purchase(&self, address: &Address, spending: U256) -> Result<TxHash, ReconcileError> {
        self.check()?;
        self.purchases.lock().push((*address, spending));
        Ok(Self::tx_hash(self.sent()))
    }

    async fn pay_fee(&self, address: &Address) -> Result<TxHash, ReconcileError> {
        self.check()?;
        self.fee_payments.lock().push(*address);
        Ok(Self::tx_hash(self.sent()))
    }
}

/// [`Workflow`] that keeps the navigation history.
pub struct RecordingWorkflow {
    step: RwLock<Step>,
    history: Mutex<Vec<Step>>,
    errors: Mutex<Vec<ReconcileError>>,
}

impl RecordingWorkflow {
    /// Workflow starting at `step`.
    pub fn starting_at(step: Step) -> Self {
        Self {
            step: RwLock::new(step),
            history: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Every `goto`, in order.
    pub fn history(&self) -> Vec<Step> {
        self.history.lock().clone()
    }

    /// Every reported error, in order.
    pub fn errors(&self) -> Vec<ReconcileError> {
        self.errors.lock().clone()
    }
}

impl Default for RecordingWorkflow {
    fn default() -> Self {
        Self::starting_at(Step::ImportantNotice)
    }
}

impl Workflow for RecordingWorkflow {
    fn current_step(&self) -> Step {
        *self.step.read()
    }

    fn goto(&self, step: Step) {
        *self.step.write() = step;
        self.history.lock().push(step);
    }

    fn report_error(&self, error: &ReconcileError) {
        self.errors.lock().push(error.clone());
    }
}
