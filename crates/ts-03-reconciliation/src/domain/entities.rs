//! # Domain Entities

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{Address, AddressState, TxHash, TxStatus};

/// Workflow steps the reconciler can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    ImportantNotice,
    UnlockAccount,
    Contribute,
    PicopsTerms,
    LateUncertified,
    Payment,
    FeePayment,
    Picops,
    Purchase,
    Summary,
}

impl Step {
    /// Route name of the step.
    pub fn as_str(self) -> &'static str {
        match self {
            Step::ImportantNotice => "important-notice",
            Step::UnlockAccount => "unlock-account",
            Step::Contribute => "contribute",
            Step::PicopsTerms => "picops-terms",
            Step::LateUncertified => "late-uncertified",
            Step::Payment => "payment",
            Step::FeePayment => "fee-payment",
            Step::Picops => "picops",
            Step::Purchase => "purchase",
            Step::Summary => "summary",
        }
    }
}

/// Chain conditions the reconciler can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Payment,
    Certification,
    FeePayment,
    Purchase,
}

impl Condition {
    /// All conditions.
    pub const ALL: [Condition; 4] = [
        Condition::Payment,
        Condition::Certification,
        Condition::FeePayment,
        Condition::Purchase,
    ];
}

/// Lifecycle of a condition watcher.
///
/// `Idle -> Watching -> Satisfied`, or `Watching -> Stopped` on unwatch,
/// restart or a permanent failure. A settled condition may be watched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConditionState {
    #[default]
    Idle,
    Watching,
    Satisfied,
    Stopped,
}

/// Work triggered by a satisfied condition besides navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentAction {
    /// Start watching the payment condition.
    WatchPayment,
    /// Broadcast the purchase transaction.
    Purchase,
    /// Broadcast the fee registrar payment.
    PayFee,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not satisfied; keep watching.
    Continue,
    /// Not satisfied; show `Step` and keep watching.
    Revisit(Step),
    /// Satisfied; navigate to `Step`.
    Advance(Step),
    /// Satisfied; run the action.
    Trigger(DependentAction),
}

impl Transition {
    /// Whether the watcher should stop after this transition.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Transition::Advance(_) | Transition::Trigger(_))
    }
}

/// Result of a mined purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub success: bool,
    /// Value credited by the contract, bonus included.
    pub accounted: Option<U256>,
    /// Value actually sent.
    pub received: Option<U256>,
}

impl PurchaseOutcome {
    /// Build from a known transaction status; `None` while still unknown.
    pub fn from_status(status: &TxStatus) -> Option<Self> {
        match *status {
            TxStatus::Unknown => None,
            TxStatus::Success {
                accounted,
                received,
            } => Some(Self {
                success: true,
                accounted: Some(accounted),
                received: Some(received),
            }),
            TxStatus::Failed => Some(Self {
                success: false,
                accounted: None,
                received: None,
            }),
        }
    }

    /// Bonus granted, in whole percent, rounded half up.
    ///
    /// `None` when nothing was accounted or no bonus applied.
    pub fn bonus_percent(&self) -> Option<i64> {
        let (accounted, received) = (self.accounted?, self.received?);
        if accounted.is_zero() || received.is_zero() || accounted == received {
            return None;
        }
        let scaled = accounted.checked_mul(U256::from(200u64))?;
        let ratio = scaled.checked_add(received)? / received.checked_mul(U256::from(2u64))?;
        if ratio > U256::from(i64::MAX as u64) {
            return None;
        }
        Some(ratio.low_u64() as i64 - 100)
    }
}

/// Local view of the contributor's account.
///
/// Refreshed from chain on every evaluation; reset by `restart`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub address: Option<Address>,
    /// Whether an encrypted wallet is available for unlocking.
    pub has_wallet: bool,
    /// Amount the contributor intends to spend, in wei.
    pub spending: U256,
    pub balance: U256,
    pub certified: Option<bool>,
    pub fee_paid: Option<bool>,
    pub accounted: U256,
    pub purchase_tx: Option<TxHash>,
    pub fee_tx: Option<TxHash>,
    pub outcome: Option<PurchaseOutcome>,
}

impl Session {
    /// Overwrite the chain-derived fields.
    pub fn apply(&mut self, state: &AddressState) {
        self.balance = state.balance;
        self.certified = Some(state.certified);
        self.fee_paid = Some(state.fee_paid);
        self.accounted = state.accounted;
    }
}
