//! # Domain Layer
//!
//! The ledger, the merge algorithm and its invariants.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod merge;
