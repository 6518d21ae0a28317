//! # Adapters

pub mod memory_registry;
