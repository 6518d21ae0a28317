//! # Ledger Service
//!
//! Owns the live ledger and keeps it in step with the chain.
//!
//! - `bootstrap` scans `[from_block, head]` once
//! - `poll_new_block(n)` scans `(cursor, n]`
//! - `run` drives polling from new-block notifications until shutdown
//!
//! Polls are serialized. A failed merge leaves both the ledger and the poll
//! cursor untouched, so the next notification retries the same range.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use shared_bus::BlockSubscription;
use shared_types::{BlockNumber, EventKind, Timestamp};
use tokio::sync::{watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::domain::entities::{Ledger, MergeReport};
use crate::domain::errors::LedgerError;
use crate::domain::merge::merge_logs;
use crate::ports::inbound::LedgerApi;
use crate::ports::outbound::{BlockSource, LogFilter, LogSource};

#[derive(Default)]
struct LedgerState {
    ledger: Ledger,
    /// Highest block whose logs have been merged.
    cursor: Option<BlockNumber>,
}

/// Live ledger backed by a chain client.
pub struct LedgerService<C: BlockSource + LogSource> {
    config: LedgerConfig,
    chain: Arc<C>,
    state: RwLock<LedgerState>,
    poll_lock: Mutex<()>,
    failed_merges: AtomicU64,
}

impl<C: BlockSource + LogSource> LedgerService<C> {
    /// Create a service with an empty ledger.
    pub fn new(config: LedgerConfig, chain: Arc<C>) -> Self {
        Self {
            config,
            chain,
            state: RwLock::new(LedgerState::default()),
            poll_lock: Mutex::new(()),
            failed_merges: AtomicU64::new(0),
        }
    }

    /// Highest block merged so far.
    pub fn cursor(&self) -> Option<BlockNumber> {
        self.state.read().cursor
    }

    /// Number of polls whose merge failed.
    pub fn failed_merges(&self) -> u64 {
        self.failed_merges.load(Ordering::Relaxed)
    }

    /// Merge every historical sale event up to the current head.
    pub async fn bootstrap(&self) -> Result<MergeReport, LedgerError> {
        let head = match timeout(self.config.lookup_timeout(), self.chain.latest_block()).await {
            Ok(Ok(head)) => head,
            Ok(Err(err)) => return Err(LedgerError::HeadLookup(err.to_string())),
            Err(_) => return Err(LedgerError::Timeout),
        };
        let report = self.poll_new_block(head).await?;
        info!(
            head,
            entries = self.state.read().ledger.len(),
            "Ledger bootstrapped"
        );
        Ok(report)
    }

    /// Merge the logs of every block after the cursor up to `head`.
    pub async fn poll_new_block(&self, head: BlockNumber) -> Result<MergeReport, LedgerError> {
        let _guard = self.poll_lock.lock().await;

        let (prior, cursor) = {
            let state = self.state.read();
            (state.ledger.clone(), state.cursor)
        };
        let from = cursor.map_or(self.config.from_block, |c| c + 1);
        if head < from {
            return Ok(MergeReport::default());
        }

        let result = self.merge_range(&prior, LogFilter::new(from, head)).await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.failed_merges.fetch_add(1, Ordering::Relaxed);
                warn!(from, to = head, error = %err, "Ledger merge aborted");
                return Err(err);
            }
        };

        let mut state = self.state.write();
        state.ledger = outcome.ledger;
        state.cursor = Some(head);
        debug!(
            from,
            to = head,
            appended = outcome.report.appended,
            "Ledger advanced"
        );
        Ok(outcome.report)
    }

    /// Poll on every block notification until `shutdown` flips to `true`.
    ///
    /// Bootstraps first if that has not happened yet; a failed bootstrap is
    /// retried on the next block.
    pub async fn run(&self, mut blocks: BlockSubscription, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Ledger poller stopping");
                        return;
                    }
                }
                block = blocks.recv() => {
                    let Ok(head) = block else {
                        info!("Block bus closed, ledger poller stopping");
                        return;
                    };
                    let result = if self.cursor().is_none() {
                        self.bootstrap().await
                    } else {
                        self.poll_new_block(head).await
                    };
                    if let Err(err) = result {
                        debug!(head, kind = ?err.kind(), "Poll failed, retrying on next block");
                    }
                }
            }
        }
    }

    async fn merge_range(
        &self,
        prior: &Ledger,
        filter: LogFilter,
    ) -> Result<crate::domain::entities::MergeOutcome, LedgerError> {
        let fetch = self.chain.get_logs(&EventKind::ALL, filter);
        let raw = match timeout(self.config.lookup_timeout(), fetch).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => return Err(LedgerError::LogFetch(err.to_string())),
            Err(_) => return Err(LedgerError::Timeout),
        };
        let raw: Vec<_> = raw
            .into_iter()
            .filter(|log| log.contract == self.config.contract)
            .collect();
        merge_logs(prior, &raw, |block| self.block_timestamp(block)).await
    }

    async fn block_timestamp(&self, block: BlockNumber) -> Result<Timestamp, LedgerError> {
        match timeout(self.config.lookup_timeout(), self.chain.get_block(block)).await {
            Ok(Ok(header)) => Ok(header.timestamp),
            Ok(Err(err)) => Err(LedgerError::lookup(block, err)),
            Err(_) => Err(LedgerError::Timeout),
        }
    }
}

impl<C: BlockSource + LogSource> LedgerApi for LedgerService<C> {
    fn ledger(&self) -> Ledger {
        self.state.read().ledger.clone()
    }
}
