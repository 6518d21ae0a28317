//! # Quota Decisions
//!
//! Pure helpers over one origin's address table (address → last-seen epoch
//! millis). The service layer applies them against the store.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::clock::millis;

/// Whether an entry last seen at `last_seen` has outlived `ttl` at `now`.
///
/// Entries whose value cannot be parsed are treated as stale.
pub fn is_stale(last_seen: &str, now: u64, ttl: Duration) -> bool {
    match last_seen.parse::<u64>() {
        Ok(at) => now.saturating_sub(at) >= millis(ttl),
        Err(_) => true,
    }
}

/// Addresses in `entries` that are eligible for eviction.
pub fn stale_addresses(entries: &HashMap<String, String>, now: u64, ttl: Duration) -> Vec<String> {
    entries
        .iter()
        .filter(|(_, last_seen)| is_stale(last_seen, now, ttl))
        .map(|(address, _)| address.clone())
        .collect()
}

/// Time until the oldest live entry expires, freeing a slot.
pub fn retry_after(entries: &HashMap<String, String>, now: u64, ttl: Duration) -> Duration {
    let ttl_ms = millis(ttl);
    entries
        .values()
        .filter_map(|v| v.parse::<u64>().ok())
        .map(|at| at.saturating_add(ttl_ms).saturating_sub(now))
        .min()
        .map(Duration::from_millis)
        .unwrap_or(ttl)
}

/// Case-insensitive key for an address.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, u64)]) -> HashMap<String, String> {
        rows.iter()
            .map(|(a, t)| (a.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn test_staleness_boundary_is_inclusive() {
        let ttl = Duration::from_millis(1_000);
        assert!(!is_stale("1000", 1_999, ttl));
        assert!(is_stale("1000", 2_000, ttl));
        assert!(is_stale("garbage", 0, ttl));
    }

    #[test]
    fn test_stale_addresses() {
        let entries = table(&[("0xaa", 0), ("0xbb", 900)]);
        let mut stale = stale_addresses(&entries, 1_000, Duration::from_millis(1_000));
        stale.sort();
        assert_eq!(stale, vec!["0xaa".to_string()]);
    }

    #[test]
    fn test_retry_after_uses_oldest_entry() {
        let entries = table(&[("0xaa", 100), ("0xbb", 600)]);
        let wait = retry_after(&entries, 1_000, Duration::from_millis(1_000));
        assert_eq!(wait, Duration::from_millis(100));
    }

    #[test]
    fn test_unbounded_ttl_never_expires() {
        let entries = table(&[("0xaa", 1_000)]);
        assert!(!is_stale("1000", u64::MAX, Duration::MAX));
        assert!(stale_addresses(&entries, u64::MAX, Duration::MAX).is_empty());
        assert_eq!(
            retry_after(&entries, 2_000, Duration::MAX),
            Duration::from_millis(u64::MAX - 2_000)
        );
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" 0xABcd "), "0xabcd");
    }
}
