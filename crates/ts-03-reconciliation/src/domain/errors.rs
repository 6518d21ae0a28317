//! # Reconciliation Errors

use shared_types::{ChainError, ErrorKind};
use thiserror::Error;

/// Reconciliation error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// No account has been selected yet.
    #[error("No address set for this session")]
    NoAccount,

    /// Unlocking was requested without a stored wallet.
    #[error("No wallet file found in storage")]
    NoWallet,

    /// The wait was abandoned by a restart.
    #[error("Session restarted")]
    Cancelled,

    /// A chain read failed.
    #[error("Chain read failed: {0}")]
    Chain(#[from] ChainError),

    /// A chain read exceeded its deadline.
    #[error("Chain read timed out")]
    Timeout,

    /// Broadcasting a transaction failed.
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

impl ReconcileError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::NoAccount | ReconcileError::NoWallet => ErrorKind::Input,
            ReconcileError::Cancelled => ErrorKind::Cancelled,
            ReconcileError::Chain(err) => err.kind(),
            ReconcileError::Timeout => ErrorKind::TransientChain,
            ReconcileError::Transaction(_) => ErrorKind::Internal,
        }
    }

    /// Whether the watcher should keep polling after this error.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientChain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_errors_are_transient() {
        assert!(ReconcileError::from(ChainError::Timeout).is_transient());
        assert!(ReconcileError::Timeout.is_transient());
        assert!(!ReconcileError::NoAccount.is_transient());
    }

    #[test]
    fn test_cancelled_kind() {
        assert_eq!(ReconcileError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            ReconcileError::NoWallet.to_string(),
            "No wallet file found in storage"
        );
    }
}
