//! # Middleware and Extractors

pub mod client_ip;
