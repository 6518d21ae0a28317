//! # Event Ledger (TS-02)
//!
//! Turns the sale contract's `Buyin` and `Injected` events into a cumulative,
//! time-ordered ledger of accounted value, one point per block.
//!
//! ## Module Structure
//!
//! ```text
//! ts-02-event-ledger/
//! ├── domain/      # Ledger, merge algorithm, invariants, errors
//! ├── ports/       # LedgerApi (inbound), chain block/log sources (outbound), mock chain
//! ├── service.rs   # LedgerService: bootstrap, per-block polling, snapshots
//! └── config.rs    # LedgerConfig
//! ```
//!
//! ## Merge Policies
//!
//! | Situation | Policy |
//! |-----------|--------|
//! | Event from a block at or below the ledger tip | dropped as already accounted |
//! | Pending, unknown-kind or amount-less event | dropped, logged, counted |
//! | Timestamp lookup failure | whole batch aborted, ledger untouched |
//! | Several events in one block | collapsed to the block's highest total |

#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::LedgerConfig;
pub use domain::entities::{DecodedEvent, Ledger, MergeOutcome, MergeReport};
pub use domain::errors::LedgerError;
pub use domain::invariants::check_ledger_invariants;
pub use domain::merge::{decode_event, merge_logs};
pub use ports::inbound::LedgerApi;
pub use ports::outbound::{BlockSource, LogFilter, LogSource, MockChain};
pub use service::LedgerService;
