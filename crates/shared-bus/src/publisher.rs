//! # Block Publisher
//!
//! The publishing side of the new-block bus.

use crate::subscriber::BlockSubscription;
use shared_types::BlockNumber;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, trace};

/// Source of new-block subscriptions.
///
/// Consumers depend on this trait rather than on [`BlockBus`] so tests can
/// hand them a bus they drive by hand.
pub trait BlockNotifier: Send + Sync {
    /// Subscribe to chain-head updates from now on.
    fn subscribe(&self) -> BlockSubscription;
}

/// In-memory new-block bus backed by `tokio::sync::watch`.
pub struct BlockBus {
    /// Latest head, `None` until the first block is published.
    sender: watch::Sender<Option<BlockNumber>>,
    /// Live subscription count.
    active: Arc<AtomicUsize>,
    /// Heads accepted so far.
    blocks_published: AtomicU64,
}

impl BlockBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
            blocks_published: AtomicU64::new(0),
        }
    }

    /// Publish a new chain head.
    ///
    /// Returns `false` when the head is not newer than the current one.
    pub fn publish(&self, block: BlockNumber) -> bool {
        let accepted = self.sender.send_if_modified(|head| match *head {
            Some(current) if current >= block => false,
            _ => {
                *head = Some(block);
                true
            }
        });

        if accepted {
            self.blocks_published.fetch_add(1, Ordering::Relaxed);
            debug!(
                block = block,
                subscribers = self.subscriber_count(),
                "New block published"
            );
        } else {
            trace!(block = block, "Ignoring stale block");
        }
        accepted
    }

    /// Latest published head.
    #[must_use]
    pub fn head(&self) -> Option<BlockNumber> {
        *self.sender.borrow()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Total heads accepted since creation.
    #[must_use]
    pub fn blocks_published(&self) -> u64 {
        self.blocks_published.load(Ordering::Relaxed)
    }
}

impl Default for BlockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockNotifier for BlockBus {
    fn subscribe(&self) -> BlockSubscription {
        let receiver = self.sender.subscribe();
        self.active.fetch_add(1, Ordering::SeqCst);
        debug!("New block subscription created");
        BlockSubscription::new(receiver, Arc::clone(&self.active))
    }
}
