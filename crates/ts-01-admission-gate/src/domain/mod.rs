//! # Domain Layer
//!
//! Pure admission logic with no I/O dependencies.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod quota;
pub mod signature;
