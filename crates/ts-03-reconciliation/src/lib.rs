//! # Reconciliation Loop (TS-03)
//!
//! Re-derives a contributor's sale progress from chain state on every new
//! block and drives the purchase workflow forward.
//!
//! ## Conditions
//!
//! | Condition | Satisfied when | Effect |
//! |-----------|----------------|--------|
//! | `Certification` | address is certified | start watching `Payment` |
//! | `Payment` | balance covers spending, gas and any unpaid fee | purchase, pay fee, or go to `Picops` |
//! | `FeePayment` | fee registrar lists the address | go to `Picops` |
//! | `Purchase` | purchase transaction has a receipt | record outcome, go to `Summary` |
//!
//! Each watched condition runs as its own task fed by a coalescing block
//! subscription. A satisfied condition unsubscribes before its effect runs,
//! so the effect happens once and later blocks are not evaluated.
//!
//! ## Module Structure
//!
//! ```text
//! ts-03-reconciliation/
//! ├── domain/      # steps, transitions, fee maths, routing, errors
//! ├── ports/       # ReconcileApi (inbound); AccountReader, SaleActions, Workflow (outbound)
//! ├── unlock.rs    # UnlockGate
//! ├── service.rs   # Reconciler
//! └── config.rs    # ReconcileConfig
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;
pub mod unlock;

pub use config::ReconcileConfig;
pub use domain::conditions::{
    evaluate_certification, evaluate_fee_payment, evaluate_payment, evaluate_purchase,
};
pub use domain::entities::{
    Condition, ConditionState, DependentAction, PurchaseOutcome, Session, Step, Transition,
};
pub use domain::errors::ReconcileError;
pub use domain::fees::{missing_wei, FeeSchedule};
pub use domain::routing::route_contribution;
pub use ports::inbound::ReconcileApi;
pub use ports::outbound::{
    AccountReader, MockAccountReader, RecordingActions, RecordingWorkflow, SaleActions, Workflow,
};
pub use service::Reconciler;
pub use unlock::{UnlockGate, UnlockWait};
