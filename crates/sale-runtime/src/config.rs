//! # Runtime Configuration
//!
//! Defaults come from each crate's config; `SALE_*` environment variables
//! override them.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `SALE_RPC_URL` | JSON-RPC endpoint of the node |
//! | `SALE_CONTRACT` | sale contract address |
//! | `SALE_FROM_BLOCK` | first block to scan for sale events |
//! | `SALE_HTTP_PORT` | HTTP port |
//! | `SALE_QUOTA_MAX` | addresses per origin |
//! | `SALE_QUOTA_TTL_MS` | quota entry lifetime |
//! | `SALE_CHALLENGE` | message contributors sign |
//! | `SALE_POLL_MS` | chain head polling interval |
//! | `SALE_TRUSTED_PROXIES` | comma-separated proxy IPs allowed to forward the client address |

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use shared_types::parse_address;
use tracing::{info, warn};
use ts_01_admission_gate::QuotaConfig;
use ts_02_event_ledger::LedgerConfig;
use ts_04_api_gateway::GatewayConfig;

/// Complete backend configuration.
#[derive(Debug, Clone)]
pub struct SaleConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Interval between head polls.
    pub poll_interval_ms: u64,
    /// Origin quota.
    pub quota: QuotaConfig,
    /// Ledger (contract, start block, chain deadlines).
    pub ledger: LedgerConfig,
    /// HTTP server.
    pub gateway: GatewayConfig,
}

impl Default for SaleConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".into(),
            poll_interval_ms: 4_000,
            quota: QuotaConfig::default(),
            ledger: LedgerConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl SaleConfig {
    /// Head polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SALE_RPC_URL") {
            self.rpc_url = url;
        }
        if let Some(contract) = lookup("SALE_CONTRACT") {
            match parse_address(&contract) {
                Ok(address) => self.ledger.contract = address,
                Err(err) => warn!(error = %err, "SALE_CONTRACT is not a valid address"),
            }
        }
        if let Some(challenge) = lookup("SALE_CHALLENGE") {
            self.gateway.challenge = challenge;
        }
        if let Some(raw) = lookup("SALE_TRUSTED_PROXIES") {
            match parse_ip_list(&raw) {
                Ok(proxies) => {
                    info!(count = proxies.len(), "Trusted proxies configured");
                    self.gateway.trusted_proxies = proxies;
                }
                Err(err) => warn!(value = %raw, error = %err, "Ignoring SALE_TRUSTED_PROXIES"),
            }
        }
        override_parsed(&lookup, "SALE_FROM_BLOCK", &mut self.ledger.from_block);
        override_parsed(&lookup, "SALE_HTTP_PORT", &mut self.gateway.port);
        override_parsed(
            &lookup,
            "SALE_QUOTA_MAX",
            &mut self.quota.max_addresses_per_origin,
        );
        override_parsed(&lookup, "SALE_QUOTA_TTL_MS", &mut self.quota.ttl_ms);
        override_parsed(&lookup, "SALE_POLL_MS", &mut self.poll_interval_ms);
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            bail!("rpc_url cannot be empty");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms cannot be 0");
        }
        if self.ledger.contract == [0u8; 20] {
            bail!("sale contract address is not set (SALE_CONTRACT)");
        }
        self.quota
            .validate()
            .map_err(anyhow::Error::msg)
            .context("quota")?;
        self.ledger
            .validate()
            .map_err(anyhow::Error::msg)
            .context("ledger")?;
        self.gateway
            .validate()
            .map_err(anyhow::Error::msg)
            .context("gateway")?;
        Ok(())
    }
}

fn override_parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse() {
            Ok(value) => {
                *target = value;
                info!(key, "Configuration override applied");
            }
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable override"),
        }
    }
}

fn parse_ip_list(raw: &str) -> std::result::Result<Vec<IpAddr>, std::net::AddrParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse)
        .collect()
}

/// Defaults with overrides from the process environment.
pub fn load_config() -> SaleConfig {
    let mut config = SaleConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok());
    config
}
