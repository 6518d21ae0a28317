//! # Condition Transitions
//!
//! One pure function per condition, mapping the latest chain snapshot to a
//! [`Transition`].

use primitive_types::U256;
use shared_types::{AddressState, TxStatus};

use super::entities::{DependentAction, Step, Transition};

/// Certified addresses move on to the payment check.
pub fn evaluate_certification(state: &AddressState) -> Transition {
    if state.certified {
        Transition::Trigger(DependentAction::WatchPayment)
    } else {
        Transition::Continue
    }
}

/// A paid fee unlocks the certification step.
pub fn evaluate_fee_payment(state: &AddressState) -> Transition {
    if state.fee_paid {
        Transition::Advance(Step::Picops)
    } else {
        Transition::Continue
    }
}

/// Once the balance covers everything, buy if certified, otherwise pay the
/// fee if still due, otherwise go get certified.
pub fn evaluate_payment(state: &AddressState, missing: U256, current: Step) -> Transition {
    if missing.is_zero() {
        if state.certified {
            Transition::Trigger(DependentAction::Purchase)
        } else if !state.fee_paid {
            Transition::Trigger(DependentAction::PayFee)
        } else {
            Transition::Advance(Step::Picops)
        }
    } else if current != Step::Payment {
        Transition::Revisit(Step::Payment)
    } else {
        Transition::Continue
    }
}

/// Any receipt, success or revert, ends the purchase wait.
pub fn evaluate_purchase(status: &TxStatus) -> Transition {
    match status {
        TxStatus::Unknown => Transition::Continue,
        TxStatus::Success { .. } | TxStatus::Failed => Transition::Advance(Step::Summary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(certified: bool, fee_paid: bool) -> AddressState {
        AddressState {
            certified,
            fee_paid,
            ..Default::default()
        }
    }

    #[test]
    fn test_payment_funded_paths() {
        let zero = U256::zero();
        assert_eq!(
            evaluate_payment(&state(true, false), zero, Step::Payment),
            Transition::Trigger(DependentAction::Purchase)
        );
        assert_eq!(
            evaluate_payment(&state(false, false), zero, Step::Payment),
            Transition::Trigger(DependentAction::PayFee)
        );
        assert_eq!(
            evaluate_payment(&state(false, true), zero, Step::Payment),
            Transition::Advance(Step::Picops)
        );
    }

    #[test]
    fn test_payment_underfunded_revisits_once() {
        let missing = U256::from(1u64);
        assert_eq!(
            evaluate_payment(&state(true, true), missing, Step::Contribute),
            Transition::Revisit(Step::Payment)
        );
        assert_eq!(
            evaluate_payment(&state(true, true), missing, Step::Payment),
            Transition::Continue
        );
    }

    #[test]
    fn test_certification_and_fee() {
        assert_eq!(
            evaluate_certification(&state(false, true)),
            Transition::Continue
        );
        assert_eq!(
            evaluate_certification(&state(true, false)),
            Transition::Trigger(DependentAction::WatchPayment)
        );
        assert_eq!(
            evaluate_fee_payment(&state(false, true)),
            Transition::Advance(Step::Picops)
        );
    }

    #[test]
    fn test_purchase_waits_for_receipt() {
        assert_eq!(evaluate_purchase(&TxStatus::Unknown), Transition::Continue);
        assert_eq!(
            evaluate_purchase(&TxStatus::Failed),
            Transition::Advance(Step::Summary)
        );
    }
}
