//! In-memory quota store with per-key expiry.
//!
//! Mirrors the hash-with-TTL semantics of an external key-value store so the
//! gate behaves the same in single-process deployments and in tests.

use crate::domain::clock::{millis, Clock, SystemClock};
use crate::ports::outbound::{QuotaStore, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Default)]
struct Record {
    fields: HashMap<String, String>,
    /// Epoch millis after which the whole key is gone.
    expires_at: Option<u64>,
}

/// Hash-per-key store kept in process memory.
pub struct InMemoryQuotaStore {
    records: Mutex<HashMap<String, Record>>,
    clock: Arc<dyn Clock>,
    unavailable: AtomicBool,
}

impl InMemoryQuotaStore {
    /// Store driven by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            clock,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate an outage: every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        let now = self.clock.now_millis();
        let mut records = self.records.lock();
        purge_expired(&mut records, now);
        records.len()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".into()));
        }
        Ok(())
    }

    fn with_live<R>(&self, key: &str, f: impl FnOnce(Option<&mut Record>) -> R) -> R {
        let now = self.clock.now_millis();
        let mut records = self.records.lock();
        let expired = records
            .get(key)
            .and_then(|r| r.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            trace!(key = key, "Quota key expired");
            records.remove(key);
        }
        f(records.get_mut(key))
    }
}

impl Default for InMemoryQuotaStore {
    fn default() -> Self {
        Self::new()
    }
}

fn purge_expired(records: &mut HashMap<String, Record>, now: u64) {
    records.retain(|_, r| r.expires_at.map_or(true, |at| at > now));
}

#[async_trait]
impl QuotaStore for InMemoryQuotaStore {
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.check_available()?;
        let deadline = self.clock.now_millis().saturating_add(millis(ttl));
        self.with_live(key, |record| {
            if let Some(record) = record {
                record.expires_at = Some(deadline);
            }
        });
        Ok(())
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        self.check_available()?;
        Ok(self.with_live(key, |record| record.map_or(0, |r| r.fields.len())))
    }

    async fn get_all(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        self.check_available()?;
        Ok(self.with_live(key, |record| {
            record.map(|r| r.fields.clone()).unwrap_or_default()
        }))
    }

    async fn contains(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.with_live(key, |record| {
            record.is_some_and(|r| r.fields.contains_key(field))
        }))
    }

    async fn set(&self, key: &str, field: &str, value: String) -> Result<(), StoreError> {
        self.check_available()?;
        let now = self.clock.now_millis();
        let mut records = self.records.lock();
        if records
            .get(key)
            .and_then(|r| r.expires_at)
            .is_some_and(|at| at <= now)
        {
            records.remove(key);
        }
        records
            .entry(key.to_string())
            .or_default()
            .fields
            .insert(field.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str, field: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let now = self.clock.now_millis();
        let mut records = self.records.lock();
        if let Some(record) = records.get_mut(key) {
            record.fields.remove(field);
            if record.fields.is_empty() {
                records.remove(key);
            }
        }
        purge_expired(&mut records, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn store() -> (Arc<ManualClock>, InMemoryQuotaStore) {
        let clock = Arc::new(ManualClock::new(10_000));
        let store = InMemoryQuotaStore::with_clock(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_set_and_read_back() {
        let (_, store) = store();
        store.set("k", "0xaa", "1".into()).await.unwrap();
        store.set("k", "0xbb", "2".into()).await.unwrap();

        assert_eq!(store.len("k").await.unwrap(), 2);
        assert!(store.contains("k", "0xaa").await.unwrap());
        assert_eq!(store.get_all("k").await.unwrap().get("0xbb"), Some(&"2".to_string()));
    }

    #[tokio::test]
    async fn test_key_expires_after_ttl() {
        let (clock, store) = store();
        store.set("k", "0xaa", "1".into()).await.unwrap();
        store.expire("k", Duration::from_millis(500)).await.unwrap();

        clock.advance(Duration::from_millis(499));
        assert_eq!(store.len("k").await.unwrap(), 1);

        clock.advance(Duration::from_millis(1));
        assert_eq!(store.len("k").await.unwrap(), 0);
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_expire_on_missing_key_is_noop() {
        let (_, store) = store();
        store.expire("missing", Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_removing_last_field_drops_key() {
        let (_, store) = store();
        store.set("k", "0xaa", "1".into()).await.unwrap();
        store.remove("k", "0xaa").await.unwrap();
        assert_eq!(store.key_count(), 0);
    }

    #[tokio::test]
    async fn test_outage() {
        let (_, store) = store();
        store.set_unavailable(true);
        assert!(matches!(
            store.len("k").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
