//! # Admission Service
//!
//! Application service implementing [`AdmissionApi`].
//!
//! ## Quota algorithm (per origin, under the origin lock)
//!
//! 1. Refresh the key TTL
//! 2. Count addresses on file
//! 3. If the count reached the limit, sweep stale entries and recount
//! 4. Admit if the address is already on file or a slot is free
//! 5. Otherwise fail with `QuotaExceeded`

use crate::config::QuotaConfig;
use crate::domain::clock::{millis, Clock, SystemClock};
use crate::domain::entities::{RpcSignature, SignedClaim};
use crate::domain::errors::AdmissionError;
use crate::domain::quota::{normalize_address, retry_after, stale_addresses};
use crate::domain::signature::verify_signature as verify_claim;
use crate::ports::inbound::AdmissionApi;
use crate::ports::outbound::{QuotaStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::{address_to_hex, parse_address, Address};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Admission gate service.
pub struct AdmissionService<S: QuotaStore> {
    config: QuotaConfig,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    /// One async lock per origin currently being checked.
    origin_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: QuotaStore> AdmissionService<S> {
    /// Create a service using the system clock.
    pub fn new(config: QuotaConfig, store: Arc<S>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create a service with an explicit clock.
    pub fn with_clock(config: QuotaConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            origin_locks: DashMap::new(),
        }
    }

    /// Quota configuration in effect.
    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Number of origins with a check in flight.
    pub fn locked_origins(&self) -> usize {
        self.origin_locks.len()
    }

    async fn check_quota_locked(&self, key: &str, address: &str) -> Result<(), AdmissionError> {
        let ttl = self.config.ttl();
        let limit = self.config.max_addresses_per_origin;
        let now = self.clock.now_millis();

        self.store.expire(key, ttl).await.map_err(store_error)?;
        let mut count = self.store.len(key).await.map_err(store_error)?;

        if count >= limit {
            let entries = self.store.get_all(key).await.map_err(store_error)?;
            for stale in stale_addresses(&entries, now, ttl) {
                debug!(key = key, address = %stale, "Evicting stale quota entry");
                self.store.remove(key, &stale).await.map_err(store_error)?;
            }
            count = self.store.len(key).await.map_err(store_error)?;
        }

        let known = self.store.contains(key, address).await.map_err(store_error)?;
        if count < limit || known {
            self.store
                .set(key, address, now.to_string())
                .await
                .map_err(store_error)?;
            self.store.expire(key, ttl).await.map_err(store_error)?;
            return Ok(());
        }

        let entries = self.store.get_all(key).await.map_err(store_error)?;
        Err(AdmissionError::QuotaExceeded {
            retry_after: retry_after(&entries, now, ttl),
        })
    }

    fn origin_lock(&self, origin: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.origin_locks
                .entry(origin.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    fn release_origin_lock(&self, origin: &str) {
        self.origin_locks
            .remove_if(origin, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl<S: QuotaStore + 'static> AdmissionApi for AdmissionService<S> {
    fn verify_signature(
        &self,
        claimed_address: &str,
        message: &str,
        signature: &str,
    ) -> Result<Address, AdmissionError> {
        let claimed = parse_address(claimed_address)?;
        let rpc = RpcSignature::from_rpc_hex(signature)?;

        verify_claim(&claimed, message.as_bytes(), &rpc).map_err(|e| {
            warn!(
                security = true,
                claimed = %address_to_hex(&claimed),
                error = %e,
                "Signature verification failed"
            );
            AdmissionError::from(e)
        })
    }

    async fn check_quota(&self, origin: &str, claimed_address: &str) -> Result<(), AdmissionError> {
        let address = normalize_address(claimed_address);
        let key = self.config.origin_key(origin);

        let lock = self.origin_lock(origin);
        let result = {
            let _guard = lock.lock().await;
            tokio::time::timeout(
                self.config.store_timeout(),
                self.check_quota_locked(&key, &address),
            )
            .await
            .unwrap_or(Err(AdmissionError::Timeout(self.config.store_timeout())))
        };
        drop(lock);
        self.release_origin_lock(origin);

        match &result {
            Ok(()) => debug!(origin = origin, address = %address, "Quota check passed"),
            Err(AdmissionError::QuotaExceeded { retry_after }) => warn!(
                origin = origin,
                address = %address,
                retry_after_ms = millis(*retry_after),
                "Address quota exceeded"
            ),
            Err(e) => warn!(origin = origin, error = %e, "Quota check failed"),
        }
        result
    }

    async fn admit(&self, origin: &str, claim: &SignedClaim) -> Result<Address, AdmissionError> {
        let verified =
            self.verify_signature(&claim.claimed_address, &claim.message, &claim.signature)?;
        self.check_quota(origin, &address_to_hex(&verified)).await?;

        info!(origin = origin, address = %address_to_hex(&verified), "Claim admitted");
        Ok(verified)
    }
}

fn store_error(err: StoreError) -> AdmissionError {
    AdmissionError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryQuotaStore;
    use crate::domain::clock::ManualClock;
    use crate::domain::signature::test_helpers::generate_keypair;
    use crate::domain::signature::sign_personal_message;
    use std::time::Duration;

    const ORIGIN: &str = "203.0.113.7";
    const A: &str = "0x00000000000000000000000000000000000000aa";
    const B: &str = "0x00000000000000000000000000000000000000bb";
    const C: &str = "0x00000000000000000000000000000000000000cc";

    fn service(
        max: usize,
        ttl_ms: u64,
    ) -> (Arc<ManualClock>, Arc<InMemoryQuotaStore>, AdmissionService<InMemoryQuotaStore>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let store = Arc::new(InMemoryQuotaStore::with_clock(clock.clone()));
        let config = QuotaConfig {
            max_addresses_per_origin: max,
            ttl_ms,
            ..Default::default()
        };
        let service = AdmissionService::with_clock(config, store.clone(), clock.clone());
        (clock, store, service)
    }

    #[tokio::test]
    async fn test_quota_evicts_after_ttl() {
        let (clock, _, service) = service(2, 1_000);

        assert!(service.check_quota(ORIGIN, A).await.is_ok());
        assert!(service.check_quota(ORIGIN, B).await.is_ok());

        let err = service.check_quota(ORIGIN, C).await.unwrap_err();
        assert!(matches!(err, AdmissionError::QuotaExceeded { .. }));

        clock.advance(Duration::from_millis(1_000));
        assert!(service.check_quota(ORIGIN, C).await.is_ok());
    }

    #[tokio::test]
    async fn test_readmission_never_fails() {
        let (clock, _, service) = service(2, 1_000);
        service.check_quota(ORIGIN, A).await.unwrap();
        service.check_quota(ORIGIN, B).await.unwrap();

        for _ in 0..5 {
            clock.advance(Duration::from_millis(100));
            assert!(service.check_quota(ORIGIN, A).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_addresses_compared_case_insensitively() {
        let (_, _, service) = service(1, 1_000);
        service.check_quota(ORIGIN, "0xABCDEF0000000000000000000000000000000001").await.unwrap();
        assert!(service
            .check_quota(ORIGIN, "0xabcdef0000000000000000000000000000000001")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_origins_are_independent() {
        let (_, _, service) = service(1, 1_000);
        service.check_quota("10.0.0.1", A).await.unwrap();
        assert!(service.check_quota("10.0.0.2", B).await.is_ok());
        assert!(service.check_quota("10.0.0.1", B).await.is_err());
    }

    #[tokio::test]
    async fn test_retry_after_reports_oldest_entry() {
        let (clock, _, service) = service(1, 1_000);
        service.check_quota(ORIGIN, A).await.unwrap();
        clock.advance(Duration::from_millis(400));

        match service.check_quota(ORIGIN, B).await {
            Err(AdmissionError::QuotaExceeded { retry_after }) => {
                assert_eq!(retry_after, Duration::from_millis(600));
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_take_one_slot() {
        let (_, _, service) = service(1, 60_000);
        let service = Arc::new(service);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let address = format!("0x{:040x}", i + 1);
                    service.check_quota(ORIGIN, &address).await.is_ok()
                })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(service.locked_origins(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_commits_nothing() {
        let (_, store, service) = service(2, 1_000);
        store.set_unavailable(true);

        let err = service.check_quota(ORIGIN, A).await.unwrap_err();
        assert!(matches!(err, AdmissionError::Store(_)));

        store.set_unavailable(false);
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_admit_charges_verified_address() {
        let (_, store, service) = service(1, 60_000);
        let (key, address) = generate_keypair();
        let message = "sale terms v1";
        let claim = SignedClaim {
            claimed_address: address_to_hex(&address).to_uppercase().replacen("0X", "0x", 1),
            message: message.to_string(),
            signature: sign_personal_message(&key, message.as_bytes()).unwrap(),
        };

        assert_eq!(service.admit(ORIGIN, &claim).await, Ok(address));

        let entries = store
            .get_all(&service.config().origin_key(ORIGIN))
            .await
            .unwrap();
        assert!(entries.contains_key(&address_to_hex(&address)));
    }

    #[tokio::test]
    async fn test_admit_rejects_mismatch_without_charging_quota() {
        let (_, store, service) = service(1, 60_000);
        let (key, _) = generate_keypair();
        let (_, other) = generate_keypair();
        let claim = SignedClaim {
            claimed_address: address_to_hex(&other),
            message: "sale terms v1".into(),
            signature: sign_personal_message(&key, b"sale terms v1").unwrap(),
        };

        let err = service.admit(ORIGIN, &claim).await.unwrap_err();
        assert!(matches!(err, AdmissionError::AddressMismatch { .. }));
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_admit_rejects_malformed_address() {
        let (_, _, service) = service(1, 60_000);
        let claim = SignedClaim {
            claimed_address: "not-an-address".into(),
            message: "m".into(),
            signature: "0x00".into(),
        };
        let err = service.admit(ORIGIN, &claim).await.unwrap_err();
        assert_eq!(err.kind(), shared_types::ErrorKind::Input);
    }
}
