//! # Block Subscriber
//!
//! The receiving side of the new-block bus.

use shared_types::BlockNumber;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped.
    #[error("Block bus closed")]
    Closed,
}

/// A live new-block subscription.
///
/// Dropping the handle unsubscribes.
pub struct BlockSubscription {
    receiver: watch::Receiver<Option<BlockNumber>>,
    active: Arc<AtomicUsize>,
}

impl BlockSubscription {
    pub(crate) fn new(
        receiver: watch::Receiver<Option<BlockNumber>>,
        active: Arc<AtomicUsize>,
    ) -> Self {
        Self { receiver, active }
    }

    /// Wait for the next head.
    ///
    /// Heads published while the caller was busy are coalesced: only the
    /// latest is returned.
    pub async fn recv(&mut self) -> Result<BlockNumber, SubscriptionError> {
        loop {
            self.receiver
                .changed()
                .await
                .map_err(|_| SubscriptionError::Closed)?;
            let head = *self.receiver.borrow_and_update();
            if let Some(block) = head {
                return Ok(block);
            }
        }
    }

    /// Latest head known to the bus, without waiting.
    #[must_use]
    pub fn latest(&self) -> Option<BlockNumber> {
        *self.receiver.borrow()
    }
}

impl Drop for BlockSubscription {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!("Block subscription dropped");
    }
}
