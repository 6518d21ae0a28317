//! # Ledger Errors

use shared_types::{BlockNumber, ChainError, ErrorKind, Timestamp};
use thiserror::Error;

/// Ledger error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// A block timestamp could not be resolved.
    #[error("Timestamp lookup failed for block {block}: {reason}")]
    TimestampLookup {
        /// Block whose header was requested
        block: BlockNumber,
        /// Underlying failure
        reason: String,
    },

    /// Fetching logs from the chain failed.
    #[error("Log fetch failed: {0}")]
    LogFetch(String),

    /// Reading the chain head failed.
    #[error("Head lookup failed: {0}")]
    HeadLookup(String),

    /// A chain call exceeded its deadline.
    #[error("Chain call timed out")]
    Timeout,

    /// The running total no longer fits in 256 bits.
    #[error("Accounted total overflows at block {block}")]
    Overflow {
        /// Block whose event overflowed
        block: BlockNumber,
    },

    /// A new block resolved to a timestamp earlier than the ledger tip.
    #[error("Block {block} timestamp {timestamp} precedes ledger tip timestamp {tip}")]
    NonMonotonicTimestamp {
        /// Offending block
        block: BlockNumber,
        /// Its timestamp
        timestamp: Timestamp,
        /// Timestamp of the current tip
        tip: Timestamp,
    },
}

impl LedgerError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::TimestampLookup { .. }
            | LedgerError::LogFetch(_)
            | LedgerError::HeadLookup(_)
            | LedgerError::Timeout => ErrorKind::TransientChain,
            LedgerError::Overflow { .. } | LedgerError::NonMonotonicTimestamp { .. } => {
                ErrorKind::LedgerMergeAborted
            }
        }
    }

    pub(crate) fn lookup(block: BlockNumber, err: ChainError) -> Self {
        LedgerError::TimestampLookup {
            block,
            reason: err.to_string(),
        }
    }
}
