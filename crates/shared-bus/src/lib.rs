//! # Shared Bus - New-Block Notifications
//!
//! Fans chain-head updates out to every component that polls per block:
//! the ledger poller and each watched reconciliation condition.
//!
//! ```text
//! ┌──────────────┐   publish(n)   ┌──────────────┐  recv()  ┌──────────────┐
//! │ Chain client │ ─────────────→ │   BlockBus   │ ───────→ │  Condition   │
//! │   adapter    │                │ (watch chan) │ ───────→ │   Ledger     │
//! └──────────────┘                └──────────────┘          └──────────────┘
//! ```
//!
//! ## Delivery Semantics
//!
//! - **Coalescing:** a subscriber that is busy while several blocks arrive
//!   sees a single notification carrying the latest head. There is never
//!   more than one pending notification per subscriber.
//! - **Monotonic:** heads at or below the current head are ignored.
//! - **Ownership:** a [`BlockSubscription`] is the subscription. Dropping it
//!   unsubscribes.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

pub use publisher::{BlockBus, BlockNotifier};
pub use subscriber::{BlockSubscription, SubscriptionError};
