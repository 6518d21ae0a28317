//! # Sale Runtime
//!
//! Wires the backend together:
//!
//! ```text
//! JSON-RPC node ──→ BlockPoller ──→ BlockBus ──→ LedgerService ──→ GET /chart-data
//!                                                      ↑
//!                   JsonRpcChain (blocks, logs) ───────┘
//!
//! POST /register ──→ AdmissionService (signature, origin quota) ──→ RegistrationStore
//! ```
//!
//! ## Modules
//!
//! - `config` - `SaleConfig` and `SALE_*` environment overrides
//! - `adapters` - JSON-RPC implementation of the chain ports
//! - `poller` - publishes new chain heads on the block bus
//! - `runtime` - startup, task supervision and graceful shutdown

pub mod adapters;
pub mod config;
pub mod poller;
pub mod runtime;

pub use config::{load_config, SaleConfig};
pub use runtime::SaleRuntime;
