//! # API Gateway (TS-04)
//!
//! HTTP surface of the sale backend.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /register` | verify a signed challenge, charge the origin's quota, record the address |
//! | `GET /chart-data` | cumulative accounted total per block |
//! | `GET /health` | liveness |
//!
//! ## Status mapping
//!
//! | Failure | Status |
//! |---------|--------|
//! | malformed body, address or signature | 400 |
//! | signature invalid or signed by someone else | 401 |
//! | origin quota exhausted | 429 + `Retry-After` |
//! | quota or registration store unavailable | 503 |
//!
//! The origin of a request is the socket peer. When the peer is one of
//! `GatewayConfig::trusted_proxies`, the nearest untrusted `X-Forwarded-For`
//! hop is used instead, then `X-Real-IP`.

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod service;

pub use adapters::memory_registry::InMemoryRegistrationStore;
pub use domain::config::GatewayConfig;
pub use domain::error::{ApiError, GatewayError};
pub use domain::types::{RegisterRequest, RegisterResponse};
pub use middleware::client_ip::{extract_client_ip, ClientIp, TrustedProxies};
pub use ports::outbound::{RegistrationError, RegistrationStore};
pub use service::{build_router, AppState, GatewayService};
