//! # Error Types
//!
//! The error taxonomy shared across the workspace, plus hex decoding errors.

use thiserror::Error;

/// Coarse classification of every failure produced by the workspace.
///
/// Crate-level error enums expose a `kind()` method returning one of these,
/// so callers can decide on retries and status codes uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed address, signature or message. The caller's fault; never retried.
    Input,
    /// Signature invalid or signer mismatch. Terminal for the request.
    Auth,
    /// Per-origin address quota exhausted. The caller may retry later.
    QuotaExceeded,
    /// Block, log or state lookup failed. Retried on the next poll tick.
    TransientChain,
    /// A ledger batch was rejected as a whole. Retried with a fresh batch.
    LedgerMergeAborted,
    /// An in-flight wait was cancelled by a restart.
    Cancelled,
    /// Anything else (store failures, misconfiguration).
    Internal,
}

impl ErrorKind {
    /// Whether an operation failing with this kind may succeed if retried.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::QuotaExceeded | ErrorKind::TransientChain | ErrorKind::LedgerMergeAborted
        )
    }

    /// Whether the failure is security relevant and must be logged as such.
    pub fn is_security_relevant(self) -> bool {
        matches!(self, ErrorKind::Auth)
    }
}

/// Errors from decoding hex-encoded wire values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HexError {
    /// The string is missing the `0x` prefix.
    #[error("missing 0x prefix")]
    MissingPrefix,

    /// The string contains non-hex characters or has odd length.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// The decoded value has the wrong byte length.
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The value does not fit in 256 bits.
    #[error("value overflows 256 bits")]
    Overflow,
}

/// Errors reported by chain client adapters (block, log and state reads,
/// transaction broadcast). Always transient from the core's point of view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// The node could not be reached or returned a transport error.
    #[error("Chain node unavailable: {0}")]
    Unavailable(String),

    /// The requested block, log range or transaction is unknown to the node.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The node answered with data that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The call did not complete within its deadline.
    #[error("Chain call timed out")]
    Timeout,
}

impl ChainError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TransientChain
    }
}
