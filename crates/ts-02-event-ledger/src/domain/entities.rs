//! # Domain Entities

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{BlockNumber, ChartPoint, EventKind, LedgerEntry, Timestamp};

/// A raw event that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Block the event was mined in.
    pub block_number: BlockNumber,
    /// Position within the block.
    pub log_index: u64,
    /// Which sale event it is.
    pub kind: EventKind,
    /// Credited value.
    pub accounted: U256,
}

/// Append-only cumulative ledger.
///
/// Totals and timestamps are non-decreasing; block numbers are strictly
/// increasing, so no block appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Latest entry.
    pub fn tip(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    /// Highest block already represented.
    pub fn tip_block(&self) -> Option<BlockNumber> {
        self.tip().map(|e| e.block_number)
    }

    /// Timestamp of the latest entry.
    pub fn tip_timestamp(&self) -> Option<Timestamp> {
        self.tip().map(|e| e.timestamp)
    }

    /// Cumulative total so far (zero when empty).
    pub fn total(&self) -> U256 {
        self.tip().map(|e| e.total_accounted).unwrap_or_default()
    }

    /// Chart wire form.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.entries.iter().map(ChartPoint::from).collect()
    }

    /// New ledger with `appended` after the current entries.
    pub(crate) fn extended(&self, appended: Vec<LedgerEntry>) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + appended.len());
        entries.extend_from_slice(&self.entries);
        entries.extend(appended);
        Self { entries }
    }
}

/// What a merge did with its input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Events added to the running total.
    pub accepted: usize,
    /// Events rejected as malformed.
    pub malformed: usize,
    /// Events from blocks already in the ledger.
    pub replayed: usize,
    /// Ledger entries appended.
    pub appended: usize,
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The merged ledger.
    pub ledger: Ledger,
    /// Counters describing the batch.
    pub report: MergeReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total(), U256::zero());
        assert_eq!(ledger.tip_block(), None);
    }

    #[test]
    fn test_extended_keeps_prior_entries() {
        let first = LedgerEntry {
            block_number: 1,
            timestamp: 10,
            total_accounted: U256::from(5u64),
        };
        let second = LedgerEntry {
            block_number: 2,
            timestamp: 20,
            total_accounted: U256::from(9u64),
        };

        let base = Ledger::new().extended(vec![first]);
        let next = base.extended(vec![second]);

        assert_eq!(base.len(), 1);
        assert_eq!(next.entries(), &[first, second]);
        assert_eq!(next.total(), U256::from(9u64));
        assert_eq!(next.chart_points()[1].time, 20);
    }
}
