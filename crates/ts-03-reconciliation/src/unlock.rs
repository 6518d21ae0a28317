//! # Unlock Gate
//!
//! A single pending "wait for the user to unlock their wallet". The waiter
//! is resolved by [`UnlockGate::complete_unlock`] or rejected with
//! [`ReconcileError::Cancelled`] by [`UnlockGate::cancel`].

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use crate::domain::errors::ReconcileError;

type Waiter = oneshot::Sender<Result<(), ReconcileError>>;

/// Holder of the pending unlock wait, if any.
#[derive(Default)]
pub struct UnlockGate {
    pending: Mutex<Option<Waiter>>,
}

/// Handle to a pending unlock.
#[must_use = "the unlock is only observed by awaiting `wait`"]
pub struct UnlockWait {
    receiver: oneshot::Receiver<Result<(), ReconcileError>>,
}

impl UnlockWait {
    /// Resolve once the unlock completes or is cancelled.
    pub async fn wait(self) -> Result<(), ReconcileError> {
        self.receiver
            .await
            .unwrap_or(Err(ReconcileError::Cancelled))
    }
}

impl UnlockGate {
    /// Gate with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for an unlock.
    ///
    /// Fails with `NoWallet` when there is nothing to unlock. A wait already
    /// pending is cancelled and replaced.
    pub fn begin_unlock(&self, has_wallet: bool) -> Result<UnlockWait, ReconcileError> {
        if !has_wallet {
            return Err(ReconcileError::NoWallet);
        }
        let (sender, receiver) = oneshot::channel();
        if let Some(previous) = self.pending.lock().replace(sender) {
            debug!("Replacing pending unlock wait");
            let _ = previous.send(Err(ReconcileError::Cancelled));
        }
        Ok(UnlockWait { receiver })
    }

    /// Resolve the pending wait. Returns whether one was pending.
    pub fn complete_unlock(&self) -> bool {
        match self.pending.lock().take() {
            Some(waiter) => {
                let _ = waiter.send(Ok(()));
                true
            }
            None => false,
        }
    }

    /// Reject the pending wait with `Cancelled`. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(waiter) => {
                let _ = waiter.send(Err(ReconcileError::Cancelled));
                true
            }
            None => false,
        }
    }

    /// Whether a wait is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}
