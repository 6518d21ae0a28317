//! # Token-Sale Test Suite
//!
//! Flows that span more than one crate.
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── registration_flow.rs    # HTTP → admission gate → registry
//! │   ├── ledger_flow.rs          # poller → bus → ledger → /chart-data
//! │   └── reconciliation_flow.rs  # poller → bus → condition watchers
//! └── benches/
//!     └── sale_benchmarks.rs      # signature recovery, ledger merge
//! ```
//!
//! ```bash
//! cargo test -p sale-tests
//! cargo bench -p sale-tests
//! ```

pub mod integration;
