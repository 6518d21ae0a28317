//! # Block Poller
//!
//! Asks the node for its head on a fixed interval and publishes every new
//! head on the [`BlockBus`]. Stale and repeated heads are dropped by the bus.

use std::sync::Arc;
use std::time::Duration;

use shared_bus::BlockBus;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use ts_02_event_ledger::BlockSource;

/// Publishes chain heads until shut down.
pub struct BlockPoller<C: BlockSource> {
    chain: Arc<C>,
    bus: Arc<BlockBus>,
    period: Duration,
}

impl<C: BlockSource> BlockPoller<C> {
    pub fn new(chain: Arc<C>, bus: Arc<BlockBus>, period: Duration) -> Self {
        Self { chain, bus, period }
    }

    /// One poll. Returns the head when it was new.
    pub async fn poll_once(&self) -> Option<u64> {
        match self.chain.latest_block().await {
            Ok(head) => self.bus.publish(head).then_some(head),
            Err(err) => {
                warn!(error = %err, "Failed to fetch chain head");
                None
            }
        }
    }

    /// Poll every period until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period = ?self.period, "Block poller started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Block poller stopping");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    if let Some(head) = self.poll_once().await {
                        debug!(head, "Chain head advanced");
                    }
                }
            }
        }
    }
}
