//! # Ports
//!
//! - `inbound`: what the UI layer drives
//! - `outbound`: chain reads, transaction broadcast and workflow navigation

pub mod inbound;
pub mod outbound;
