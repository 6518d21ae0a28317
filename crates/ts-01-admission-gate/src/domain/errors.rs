//! # Admission Errors
//!
//! Error types for signature verification and quota enforcement.

use shared_types::{ErrorKind, HexError};
use std::time::Duration;
use thiserror::Error;

/// Errors from signature parsing and recovery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// The signature is not 65 bytes of `0x`-prefixed hex.
    #[error("Invalid signature format: {0}")]
    InvalidFormat(String),

    /// R or S is zero or not below the curve order.
    #[error("Signature component out of range")]
    ScalarOutOfRange,

    /// S is in the upper half of the curve order.
    #[error("Malleable signature (high S value)")]
    MalleableSignature,

    /// Invalid recovery ID (v must be 0, 1, 27, or 28)
    #[error("Invalid recovery ID: {0}")]
    InvalidRecoveryId(u8),

    /// Failed to recover public key from signature
    #[error("Failed to recover public key")]
    RecoveryFailed,

    /// Recovered signer does not match the claimed signer.
    #[error("Signer mismatch: expected {expected}, got {actual}")]
    SignerMismatch { expected: String, actual: String },
}

/// Errors surfaced by the admission gate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// Malformed address, message or signature encoding.
    #[error("Invalid request: {0}")]
    MalformedInput(String),

    /// Signature rejected before recovery, or recovery failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature is valid but was produced by another key.
    #[error("Wrong message signature")]
    AddressMismatch { expected: String, recovered: String },

    /// The origin already uses the maximum number of addresses.
    #[error("you exceeded the number of addresses your IP can use")]
    QuotaExceeded {
        /// Time until the oldest entry for the origin expires.
        retry_after: Duration,
    },

    /// The quota store failed.
    #[error("Quota store error: {0}")]
    Store(String),

    /// The quota store did not answer in time. Nothing was committed.
    #[error("Quota store timed out after {0:?}")]
    Timeout(Duration),
}

impl AdmissionError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdmissionError::MalformedInput(_) => ErrorKind::Input,
            AdmissionError::InvalidSignature | AdmissionError::AddressMismatch { .. } => {
                ErrorKind::Auth
            }
            AdmissionError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            AdmissionError::Store(_) | AdmissionError::Timeout(_) => ErrorKind::Internal,
        }
    }
}

impl From<SignatureError> for AdmissionError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::InvalidFormat(reason) => AdmissionError::MalformedInput(reason),
            SignatureError::SignerMismatch { expected, actual } => {
                AdmissionError::AddressMismatch {
                    expected,
                    recovered: actual,
                }
            }
            _ => AdmissionError::InvalidSignature,
        }
    }
}

impl From<HexError> for AdmissionError {
    fn from(err: HexError) -> Self {
        AdmissionError::MalformedInput(err.to_string())
    }
}
