//! # Shared Types Crate
//!
//! Chain primitives and sale domain entities shared by the admission gate,
//! the event ledger and the reconciliation loop.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every cross-crate type is defined here.
//! - **Lower-case hex on the wire**: addresses and hashes are rendered as
//!   `0x`-prefixed lower-case hex; large integers use fixed-width hex.
//! - **Typed failures**: every crate error maps onto [`ErrorKind`] so the
//!   boundary can decide on retry and status codes without string matching.

pub mod encoding;
pub mod entities;
pub mod errors;

pub use encoding::*;
pub use entities::*;
pub use errors::*;
pub use primitive_types::U256;
