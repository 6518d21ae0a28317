//! # Ports
//!
//! - `inbound`: read access offered to the HTTP surface
//! - `outbound`: chain access the ledger depends on

pub mod inbound;
pub mod outbound;
