//! # Gateway Configuration

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address.
    pub host: IpAddr,
    /// Port (default: 4000).
    pub port: u16,
    /// Message contributors sign to prove address ownership.
    pub challenge: String,
    /// Per-request deadline.
    pub request_timeout_ms: u64,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Peers allowed to report the client address in forwarding headers.
    /// Empty: the socket peer is always the origin.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4000,
            challenge: "I agree to the terms of the token sale".into(),
            request_timeout_ms: 30_000,
            max_body_bytes: 16 * 1024,
            trusted_proxies: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port cannot be 0".into());
        }
        if self.challenge.is_empty() {
            return Err("challenge cannot be empty".into());
        }
        if self.request_timeout_ms == 0 {
            return Err("request_timeout_ms cannot be 0".into());
        }
        if self.max_body_bytes == 0 {
            return Err("max_body_bytes cannot be 0".into());
        }
        Ok(())
    }

    /// Server bind address.
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Per-request deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
