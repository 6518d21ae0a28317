//! # Admission Gate (TS-01)
//!
//! Guards every state-changing request at the boundary.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): signature recovery, quota decisions, clock
//! - **Ports Layer** (`ports/`): the admission API and the quota store SPI
//! - **Adapters Layer** (`adapters/`): in-memory quota store with key TTLs
//! - **Service Layer** (`service.rs`): composes verification and quota
//!
//! ## Pipeline
//!
//! ```text
//! claim ──→ verify_signature ──→ check_quota(origin, verified address) ──→ admitted
//!                │                          │
//!          InvalidSignature           QuotaExceeded
//!          AddressMismatch
//! ```
//!
//! ## Security Notes
//!
//! - Signatures follow the personal-message convention
//!   (`"\x19Ethereum Signed Message:\n" + len + message`).
//! - Upper-half S values are rejected (homestead malleability rule).
//! - Quota check-and-update runs under a per-origin lock, so concurrent
//!   requests from one origin cannot both take the last slot.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::memory_store::InMemoryQuotaStore;
pub use config::QuotaConfig;
pub use domain::clock::{Clock, ManualClock, SystemClock};
pub use domain::entities::{RpcSignature, SignedClaim};
pub use domain::errors::{AdmissionError, SignatureError};
pub use domain::signature::{
    address_from_pubkey, hash_personal_message, recover_address, sign_personal_message,
    verify_signature,
};
pub use ports::inbound::AdmissionApi;
pub use ports::outbound::{QuotaStore, StoreError};
pub use service::AdmissionService;
