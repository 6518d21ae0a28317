//! # Domain Layer
//!
//! Pure reconciliation logic: no I/O, no tasks.

pub mod conditions;
pub mod entities;
pub mod errors;
pub mod fees;
pub mod routing;
