//! # Inbound Ports

use async_trait::async_trait;
use shared_types::Timestamp;

use crate::domain::entities::{Condition, ConditionState, Step};
use crate::domain::errors::ReconcileError;

/// Operations exposed to the workflow driver.
#[async_trait]
pub trait ReconcileApi: Send + Sync {
    /// Start watching `condition`. Returns `false` if it already was.
    fn watch(&self, condition: Condition) -> bool;

    /// Stop watching `condition`. Idempotent; returns whether it was watched.
    fn unwatch(&self, condition: Condition) -> bool;

    /// Stop everything, cancel any unlock wait, reset the session and go
    /// back to the first step.
    fn restart(&self);

    /// Current lifecycle state of `condition`.
    fn state(&self, condition: Condition) -> ConditionState;

    /// Ask the user to unlock their wallet and wait for it.
    async fn unlock(&self) -> Result<(), ReconcileError>;

    /// Enter the contribution flow.
    ///
    /// Resolves a pending unlock wait and returns `None` if there is one;
    /// otherwise routes by certification and returns the chosen step.
    async fn goto_contribute(
        &self,
        now: Timestamp,
        end_time: Timestamp,
    ) -> Result<Option<Step>, ReconcileError>;
}
