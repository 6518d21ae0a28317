//! # Ledger Invariants
//!
//! Checked after every merge in debug builds and by the property tests.

use super::entities::Ledger;

/// Verify ordering invariants, describing the first violation found.
pub fn check_ledger_invariants(ledger: &Ledger) -> Result<(), String> {
    for pair in ledger.entries().windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.block_number <= prev.block_number {
            return Err(format!(
                "block {} follows block {}",
                next.block_number, prev.block_number
            ));
        }
        if next.timestamp < prev.timestamp {
            return Err(format!(
                "timestamp {} at block {} precedes {}",
                next.timestamp, next.block_number, prev.timestamp
            ));
        }
        if next.total_accounted < prev.total_accounted {
            return Err(format!("total decreases at block {}", next.block_number));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use shared_types::LedgerEntry;

    fn entry(block: u64, ts: u64, total: u64) -> LedgerEntry {
        LedgerEntry {
            block_number: block,
            timestamp: ts,
            total_accounted: U256::from(total),
        }
    }

    #[test]
    fn test_detects_duplicate_block() {
        let ledger = Ledger::new().extended(vec![entry(1, 1, 1), entry(1, 1, 2)]);
        assert!(check_ledger_invariants(&ledger).is_err());
    }

    #[test]
    fn test_detects_decreasing_total() {
        let ledger = Ledger::new().extended(vec![entry(1, 1, 5), entry(2, 2, 4)]);
        assert!(check_ledger_invariants(&ledger)
            .unwrap_err()
            .contains("decreases"));
    }

    #[test]
    fn test_accepts_equal_timestamps() {
        let ledger = Ledger::new().extended(vec![entry(1, 7, 5), entry(2, 7, 5)]);
        assert!(check_ledger_invariants(&ledger).is_ok());
    }
}
