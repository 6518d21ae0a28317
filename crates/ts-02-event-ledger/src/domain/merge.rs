//! # Log Merge
//!
//! Folds a batch of raw sale events into a prior ledger.
//!
//! The batch is validated, every distinct block timestamp is resolved in a
//! single concurrent fan-out, events are ordered by
//! `(timestamp, block, log index)` and accumulated on top of the prior total.
//! Candidates are then collapsed to one entry per block.
//!
//! A failure anywhere before the final append returns an error and leaves the
//! prior ledger as it was; the caller keeps its old value.

use std::collections::BTreeSet;
use std::future::Future;

use futures::future::try_join_all;
use shared_types::{BlockNumber, EventKind, LedgerEntry, RawEvent, Timestamp};
use tracing::{debug, warn};

use super::entities::{DecodedEvent, Ledger, MergeOutcome, MergeReport};
use super::errors::LedgerError;

/// Validate a raw event.
///
/// Pending logs, unknown event kinds and logs without an accounted amount are
/// rejected with a short reason.
pub fn decode_event(raw: &RawEvent) -> Result<DecodedEvent, &'static str> {
    let block_number = raw.block_number.ok_or("pending log without block number")?;
    let kind = EventKind::from_name(&raw.kind).ok_or("unknown event kind")?;
    let accounted = raw.accounted.ok_or("missing accounted amount")?;
    Ok(DecodedEvent {
        block_number,
        log_index: raw.log_index,
        kind,
        accounted,
    })
}

/// Merge `raw` into `prior`, resolving block timestamps through `lookup`.
///
/// Events from blocks at or below the prior tip are treated as already
/// accounted and skipped, which makes re-feeding a batch a no-op.
pub async fn merge_logs<F, Fut>(
    prior: &Ledger,
    raw: &[RawEvent],
    lookup: F,
) -> Result<MergeOutcome, LedgerError>
where
    F: Fn(BlockNumber) -> Fut,
    Fut: Future<Output = Result<Timestamp, LedgerError>>,
{
    let mut report = MergeReport::default();
    let tip_block = prior.tip_block();

    let mut events = Vec::with_capacity(raw.len());
    for log in raw {
        match decode_event(log) {
            Ok(event) if tip_block.is_some_and(|tip| event.block_number <= tip) => {
                report.replayed += 1;
            }
            Ok(event) => events.push(event),
            Err(reason) => {
                warn!(
                    kind = %log.kind,
                    block = ?log.block_number,
                    log_index = log.log_index,
                    reason,
                    "Dropping malformed sale event"
                );
                report.malformed += 1;
            }
        }
    }

    if events.is_empty() {
        return Ok(MergeOutcome {
            ledger: prior.clone(),
            report,
        });
    }

    let blocks: Vec<BlockNumber> = events
        .iter()
        .map(|e| e.block_number)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let timestamps = try_join_all(blocks.iter().map(|&block| lookup(block))).await?;
    let timestamp_of = |block: BlockNumber| -> Timestamp {
        // `blocks` is sorted and contains every event block.
        blocks
            .binary_search(&block)
            .map(|i| timestamps[i])
            .unwrap_or_default()
    };

    let mut timed: Vec<(Timestamp, DecodedEvent)> = events
        .into_iter()
        .map(|e| (timestamp_of(e.block_number), e))
        .collect();
    timed.sort_by_key(|(ts, e)| (*ts, e.block_number, e.log_index));

    let mut running = prior.total();
    let mut appended: Vec<LedgerEntry> = Vec::new();
    let mut last_block = prior.tip_block();
    let mut last_timestamp = prior.tip_timestamp();

    for (timestamp, event) in timed {
        running = running
            .checked_add(event.accounted)
            .ok_or(LedgerError::Overflow {
                block: event.block_number,
            })?;
        report.accepted += 1;

        if let Some(entry) = appended.last_mut() {
            if entry.block_number == event.block_number {
                entry.total_accounted = entry.total_accounted.max(running);
                continue;
            }
        }

        if let Some(tip) = last_timestamp {
            if timestamp < tip {
                return Err(LedgerError::NonMonotonicTimestamp {
                    block: event.block_number,
                    timestamp,
                    tip,
                });
            }
        }
        if let Some(previous) = last_block {
            // Timestamp order contradicts block order.
            if event.block_number < previous {
                return Err(LedgerError::NonMonotonicTimestamp {
                    block: event.block_number,
                    timestamp,
                    tip: last_timestamp.unwrap_or(timestamp),
                });
            }
        }

        appended.push(LedgerEntry {
            block_number: event.block_number,
            timestamp,
            total_accounted: running,
        });
        last_block = Some(event.block_number);
        last_timestamp = Some(timestamp);
    }

    report.appended = appended.len();
    debug!(
        accepted = report.accepted,
        appended = report.appended,
        total = %running,
        "Merged sale events"
    );

    let ledger = prior.extended(appended);
    debug_assert!(super::invariants::check_ledger_invariants(&ledger).is_ok());
    Ok(MergeOutcome { ledger, report })
}
