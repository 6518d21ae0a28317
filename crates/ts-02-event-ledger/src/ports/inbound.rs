//! # Inbound Ports

use crate::domain::entities::Ledger;
use shared_types::ChartPoint;

/// Read-only view of the ledger.
pub trait LedgerApi: Send + Sync {
    /// Snapshot of the current ledger.
    fn ledger(&self) -> Ledger;

    /// Current ledger in chart wire form.
    fn chart_data(&self) -> Vec<ChartPoint> {
        self.ledger().chart_points()
    }
}
