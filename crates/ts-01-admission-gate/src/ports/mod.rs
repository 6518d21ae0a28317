//! # Ports Layer
//!
//! - **Inbound (Driving)**: the admission API used by the HTTP boundary
//! - **Outbound (Driven)**: the quota store this gate depends on

pub mod inbound;
pub mod outbound;
