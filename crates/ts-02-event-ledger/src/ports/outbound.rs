//! # Outbound Ports
//!
//! Chain data the ledger depends on. The runtime implements these over
//! JSON-RPC; [`MockChain`] backs tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{BlockHeader, BlockNumber, ChainError, EventKind, RawEvent, Timestamp};

/// Inclusive block range for log queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    /// First block (inclusive).
    pub from: BlockNumber,
    /// Last block (inclusive).
    pub to: BlockNumber,
}

impl LogFilter {
    /// Range `[from, to]`.
    pub fn new(from: BlockNumber, to: BlockNumber) -> Self {
        Self { from, to }
    }

    /// Whether `block` falls inside the range.
    pub fn contains(&self, block: BlockNumber) -> bool {
        block >= self.from && block <= self.to
    }
}

/// Block headers.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Header of block `number`.
    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, ChainError>;

    /// Current chain head.
    async fn latest_block(&self) -> Result<BlockNumber, ChainError>;
}

/// Sale contract logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Logs of the given kinds emitted within `filter`.
    async fn get_logs(
        &self,
        kinds: &[EventKind],
        filter: LogFilter,
    ) -> Result<Vec<RawEvent>, ChainError>;
}

/// In-memory chain for tests.
///
/// Blocks are mined at `genesis_time + 15 * number` unless overridden.
#[derive(Default)]
pub struct MockChain {
    head: RwLock<BlockNumber>,
    timestamps: RwLock<HashMap<BlockNumber, Timestamp>>,
    logs: RwLock<Vec<RawEvent>>,
    failing_blocks: RwLock<HashSet<BlockNumber>>,
    logs_unavailable: RwLock<bool>,
    block_calls: AtomicUsize,
    log_calls: AtomicUsize,
}

impl MockChain {
    const GENESIS_TIME: Timestamp = 1_500_000_000;
    const BLOCK_TIME: Timestamp = 15;

    /// Empty chain at block 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the head to `number`.
    pub fn set_head(&self, number: BlockNumber) {
        *self.head.write() = number;
    }

    /// Override the timestamp of one block.
    pub fn set_timestamp(&self, number: BlockNumber, timestamp: Timestamp) {
        self.timestamps.write().insert(number, timestamp);
    }

    /// Add a log. The head moves forward to include it.
    pub fn push_log(&self, event: RawEvent) {
        if let Some(block) = event.block_number {
            let mut head = self.head.write();
            *head = (*head).max(block);
        }
        self.logs.write().push(event);
    }

    /// Make header lookups for `number` fail.
    pub fn fail_block(&self, number: BlockNumber) {
        self.failing_blocks.write().insert(number);
    }

    /// Make header lookups for `number` succeed again.
    pub fn heal_block(&self, number: BlockNumber) {
        self.failing_blocks.write().remove(&number);
    }

    /// Toggle log query failures.
    pub fn set_logs_unavailable(&self, unavailable: bool) {
        *self.logs_unavailable.write() = unavailable;
    }

    /// Number of `get_block` calls served.
    pub fn block_calls(&self) -> usize {
        self.block_calls.load(Ordering::SeqCst)
    }

    /// Number of `get_logs` calls served.
    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }

    /// Timestamp the mock reports for `number`.
    pub fn timestamp_of(&self, number: BlockNumber) -> Timestamp {
        self.timestamps
            .read()
            .get(&number)
            .copied()
            .unwrap_or(Self::GENESIS_TIME + number * Self::BLOCK_TIME)
    }
}

#[async_trait]
impl BlockSource for MockChain {
    async fn get_block(&self, number: BlockNumber) -> Result<BlockHeader, ChainError> {
        self.block_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_blocks.read().contains(&number) {
            return Err(ChainError::Unavailable(format!("block {number} unavailable")));
        }
        if number > *self.head.read() {
            return Err(ChainError::NotFound(format!("block {number}")));
        }
        Ok(BlockHeader {
            number,
            timestamp: self.timestamp_of(number),
        })
    }

    async fn latest_block(&self) -> Result<BlockNumber, ChainError> {
        Ok(*self.head.read())
    }
}

#[async_trait]
impl LogSource for MockChain {
    async fn get_logs(
        &self,
        kinds: &[EventKind],
        filter: LogFilter,
    ) -> Result<Vec<RawEvent>, ChainError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        if *self.logs_unavailable.read() {
            return Err(ChainError::Unavailable("log index offline".into()));
        }
        let names: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
        Ok(self
            .logs
            .read()
            .iter()
            .filter(|log| log.block_number.is_some_and(|b| filter.contains(b)))
            .filter(|log| names.contains(&log.kind.as_str()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;

    #[tokio::test]
    async fn test_mock_filters_by_range_and_kind() {
        let chain = MockChain::new();
        chain.push_log(RawEvent::mined([1; 20], 3, 0, EventKind::Buyin, U256::one()));
        chain.push_log(RawEvent::mined([1; 20], 9, 0, EventKind::Injected, U256::one()));

        let buyins = chain
            .get_logs(&[EventKind::Buyin], LogFilter::new(0, 10))
            .await
            .unwrap();
        let ranged = chain
            .get_logs(&EventKind::ALL, LogFilter::new(4, 9))
            .await
            .unwrap();

        assert_eq!(buyins.len(), 1);
        assert_eq!(ranged[0].block_number, Some(9));
        assert_eq!(chain.latest_block().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_mock_block_failures() {
        let chain = MockChain::new();
        chain.set_head(5);
        chain.fail_block(2);

        assert!(chain.get_block(2).await.is_err());
        assert!(matches!(
            chain.get_block(6).await,
            Err(ChainError::NotFound(_))
        ));
        chain.heal_block(2);
        assert_eq!(
            chain.get_block(2).await.unwrap().timestamp,
            chain.timestamp_of(2)
        );
        assert_eq!(chain.block_calls(), 3);
    }
}
