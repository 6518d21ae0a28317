//! # Reconciler
//!
//! Runs one task per watched condition. Each task evaluates once right
//! away, then once per new-block notification. Notifications that arrive
//! during an evaluation are coalesced into a single follow-up evaluation.
//!
//! ## Watcher lifecycle
//!
//! A watcher is registered in its condition's slot together with a stop
//! channel. The task settles by removing its own registration; only the
//! task that succeeds in doing so runs the effect, so an `unwatch` or
//! `restart` racing with a satisfied evaluation suppresses the effect.
//!
//! Writes to the session made by in-flight work are tagged with the session
//! epoch and dropped if a restart happened in between. The epoch that gates
//! an effect is read under the slot lock when the watcher settles; a restart
//! bumps it under the same lock, so an effect either runs entirely within
//! its session or not at all, including any watcher it would start.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use primitive_types::U256;
use shared_bus::{BlockNotifier, BlockSubscription};
use shared_types::{Address, AddressState, ChainError, Timestamp};
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::ReconcileConfig;
use crate::domain::conditions::{
    evaluate_certification, evaluate_fee_payment, evaluate_payment, evaluate_purchase,
};
use crate::domain::entities::{
    Condition, ConditionState, DependentAction, PurchaseOutcome, Session, Step, Transition,
};
use crate::domain::errors::ReconcileError;
use crate::domain::fees::{missing_wei, FeeSchedule};
use crate::domain::routing::route_contribution;
use crate::ports::inbound::ReconcileApi;
use crate::ports::outbound::{AccountReader, SaleActions, Workflow};
use crate::unlock::UnlockGate;

struct Watcher {
    id: u64,
    /// Dropping the sender stops the task.
    _stop: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slot {
    state: ConditionState,
    watcher: Option<Watcher>,
}

struct Inner {
    config: ReconcileConfig,
    fees: FeeSchedule,
    reader: Arc<dyn AccountReader>,
    actions: Arc<dyn SaleActions>,
    workflow: Arc<dyn Workflow>,
    blocks: Arc<dyn BlockNotifier>,
    session: RwLock<Session>,
    slots: Mutex<HashMap<Condition, Slot>>,
    unlock: UnlockGate,
    epoch: AtomicU64,
    next_watcher: AtomicU64,
}

/// Block-driven reconciler for one contributor session.
///
/// Watching spawns tokio tasks, so it must be used from within a runtime.
pub struct Reconciler {
    inner: Arc<Inner>,
}

impl Reconciler {
    /// Create a reconciler with an empty session.
    pub fn new(
        config: ReconcileConfig,
        reader: Arc<dyn AccountReader>,
        actions: Arc<dyn SaleActions>,
        workflow: Arc<dyn Workflow>,
        blocks: Arc<dyn BlockNotifier>,
    ) -> Self {
        let fees = FeeSchedule::from_config(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                fees,
                reader,
                actions,
                workflow,
                blocks,
                session: RwLock::new(Session::default()),
                slots: Mutex::new(HashMap::new()),
                unlock: UnlockGate::new(),
                epoch: AtomicU64::new(0),
                next_watcher: AtomicU64::new(1),
            }),
        }
    }

    /// Select the contributor account.
    pub fn set_account(&self, address: Address, has_wallet: bool) {
        let mut session = self.inner.session.write();
        session.address = Some(address);
        session.has_wallet = has_wallet;
    }

    /// Set the amount the contributor intends to spend, in wei.
    pub fn set_spending(&self, spending: U256) {
        self.inner.session.write().spending = spending;
    }

    /// Copy of the current session.
    pub fn session(&self) -> Session {
        self.inner.session.read().clone()
    }

    /// Outcome of the purchase, once mined.
    pub fn outcome(&self) -> Option<PurchaseOutcome> {
        self.inner.session.read().outcome
    }

    /// Wei still missing for the purchase, from the last known balance.
    pub fn missing_wei(&self) -> U256 {
        let session = self.inner.session.read();
        missing_wei(
            session.spending,
            session.balance,
            session.fee_paid.unwrap_or(false),
            &self.inner.fees,
        )
    }

    /// Conditions currently being watched.
    pub fn watching(&self) -> Vec<Condition> {
        let slots = self.inner.slots.lock();
        Condition::ALL
            .into_iter()
            .filter(|c| slots.get(c).is_some_and(|s| s.watcher.is_some()))
            .collect()
    }

    /// Whether an unlock wait is outstanding.
    pub fn unlock_pending(&self) -> bool {
        self.inner.unlock.is_pending()
    }
}

#[async_trait]
impl ReconcileApi for Reconciler {
    fn watch(&self, condition: Condition) -> bool {
        self.inner.watch(condition)
    }

    fn unwatch(&self, condition: Condition) -> bool {
        self.inner.unwatch(condition)
    }

    fn restart(&self) {
        let stopped = self.inner.reset();
        let cancelled = self.inner.unlock.cancel();
        self.inner.workflow.goto(Step::ImportantNotice);
        info!(stopped, cancelled_unlock = cancelled, "Session restarted");
    }

    fn state(&self, condition: Condition) -> ConditionState {
        self.inner
            .slots
            .lock()
            .get(&condition)
            .map(|slot| slot.state)
            .unwrap_or_default()
    }

    async fn unlock(&self) -> Result<(), ReconcileError> {
        let has_wallet = self.inner.session.read().has_wallet;
        let wait = self.inner.unlock.begin_unlock(has_wallet)?;
        self.inner.workflow.goto(Step::UnlockAccount);
        wait.wait().await
    }

    async fn goto_contribute(
        &self,
        now: Timestamp,
        end_time: Timestamp,
    ) -> Result<Option<Step>, ReconcileError> {
        if self.inner.unlock.complete_unlock() {
            debug!("Resolved pending unlock");
            return Ok(None);
        }

        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let address = self.inner.address()?;
        let state = self.inner.refresh(epoch, &address).await?;
        let step = route_contribution(
            state.certified,
            now,
            end_time,
            self.inner.config.late_window_secs,
        );
        self.inner.workflow.goto(step);
        Ok(Some(step))
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.inner.stop_all();
    }
}

impl Inner {
    fn watch(self: &Arc<Self>, condition: Condition) -> bool {
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.watch_in(condition, epoch)
    }

    /// Start watching on behalf of session `epoch`. Refused once a restart
    /// has moved past it.
    fn watch_in(self: &Arc<Self>, condition: Condition, epoch: u64) -> bool {
        let id = self.next_watcher.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, stop_rx) = oneshot::channel();
        {
            let mut slots = self.slots.lock();
            if self.epoch.load(Ordering::SeqCst) != epoch {
                debug!(?condition, "Not watching for a restarted session");
                return false;
            }
            let slot = slots.entry(condition).or_default();
            if slot.watcher.is_some() {
                return false;
            }
            slot.watcher = Some(Watcher { id, _stop: stop_tx });
            slot.state = ConditionState::Watching;
        }

        let subscription = self.blocks.subscribe();
        tokio::spawn(Arc::clone(self).watch_loop(condition, id, subscription, stop_rx));
        info!(?condition, watcher = id, "Watching condition");
        true
    }

    fn unwatch(&self, condition: Condition) -> bool {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(&condition) else {
            return false;
        };
        if slot.watcher.take().is_none() {
            return false;
        }
        slot.state = ConditionState::Stopped;
        debug!(?condition, "Unwatched condition");
        true
    }

    fn stop_all(&self) -> usize {
        let mut slots = self.slots.lock();
        stop_watchers(&mut slots)
    }

    /// Stop every watcher and start a fresh session.
    fn reset(&self) -> usize {
        let mut slots = self.slots.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let stopped = stop_watchers(&mut slots);
        *self.session.write() = Session::default();
        stopped
    }

    /// Clear watcher `id` from its slot if it is still registered, returning
    /// the session epoch its effect belongs to.
    fn settle(&self, condition: Condition, id: u64, state: ConditionState) -> Option<u64> {
        let mut slots = self.slots.lock();
        match slots.get_mut(&condition) {
            Some(slot) if slot.watcher.as_ref().is_some_and(|w| w.id == id) => {
                slot.watcher = None;
                slot.state = state;
                Some(self.epoch.load(Ordering::SeqCst))
            }
            _ => None,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    async fn watch_loop(
        self: Arc<Self>,
        condition: Condition,
        id: u64,
        mut blocks: BlockSubscription,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut failures: u32 = 0;

        loop {
            let evaluated = tokio::select! {
                biased;
                _ = &mut stop => {
                    debug!(?condition, watcher = id, "Watcher stopped");
                    return;
                }
                result = self.evaluate(condition) => result,
            };

            match evaluated {
                Ok(transition) if transition.is_satisfied() => {
                    if let Some(epoch) = self.settle(condition, id, ConditionState::Satisfied) {
                        info!(?condition, ?transition, "Condition satisfied");
                        self.apply(transition, epoch).await;
                    }
                    return;
                }
                Ok(transition) => {
                    failures = 0;
                    if let Transition::Revisit(step) = transition {
                        self.workflow.goto(step);
                    }
                }
                Err(err) if err.is_transient() => {
                    failures += 1;
                    warn!(?condition, failures, error = %err, "Condition check failed");
                    if failures == self.config.failure_bound {
                        self.workflow.report_error(&err);
                    }
                }
                Err(err) => {
                    warn!(?condition, error = %err, "Condition check failed permanently");
                    if self.settle(condition, id, ConditionState::Stopped).is_some() {
                        self.workflow.report_error(&err);
                    }
                    return;
                }
            }

            tokio::select! {
                biased;
                _ = &mut stop => {
                    debug!(?condition, watcher = id, "Watcher stopped");
                    return;
                }
                block = blocks.recv() => match block {
                    Ok(block) => debug!(?condition, block, "Re-evaluating on new block"),
                    Err(_) => {
                        self.settle(condition, id, ConditionState::Stopped);
                        return;
                    }
                },
            }
        }
    }

    async fn evaluate(&self, condition: Condition) -> Result<Transition, ReconcileError> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let address = self.address()?;

        match condition {
            Condition::Certification => {
                let state = self.refresh(epoch, &address).await?;
                Ok(evaluate_certification(&state))
            }
            Condition::FeePayment => {
                let state = self.refresh(epoch, &address).await?;
                Ok(evaluate_fee_payment(&state))
            }
            Condition::Payment => {
                let state = self.refresh(epoch, &address).await?;
                let spending = self.session.read().spending;
                let missing = missing_wei(spending, state.balance, state.fee_paid, &self.fees);
                debug!(%missing, "Payment check");
                Ok(evaluate_payment(
                    &state,
                    missing,
                    self.workflow.current_step(),
                ))
            }
            Condition::Purchase => {
                let hash = self.session.read().purchase_tx;
                let Some(hash) = hash else {
                    return Ok(Transition::Continue);
                };
                let status = self.call(self.reader.tx_status(&hash)).await?;
                if let Some(outcome) = PurchaseOutcome::from_status(&status) {
                    self.commit(epoch, |s| s.outcome = Some(outcome));
                }
                Ok(evaluate_purchase(&status))
            }
        }
    }

    async fn apply(self: &Arc<Self>, transition: Transition, epoch: u64) {
        if !self.is_current(epoch) {
            debug!(?transition, "Dropping effect from before restart");
            return;
        }
        match transition {
            Transition::Advance(step) => self.workflow.goto(step),
            Transition::Trigger(DependentAction::WatchPayment) => {
                self.watch_in(Condition::Payment, epoch);
            }
            Transition::Trigger(DependentAction::Purchase) => self.purchase(epoch).await,
            Transition::Trigger(DependentAction::PayFee) => self.pay_fee(epoch).await,
            Transition::Continue | Transition::Revisit(_) => {}
        }
    }

    async fn purchase(self: &Arc<Self>, epoch: u64) {
        let (address, spending) = {
            let session = self.session.read();
            (session.address, session.spending)
        };
        if !self.is_current(epoch) {
            return;
        }
        let Some(address) = address else {
            self.workflow.report_error(&ReconcileError::NoAccount);
            return;
        };

        self.workflow.goto(Step::Purchase);
        if !self.is_current(epoch) {
            debug!("Restarted before purchase was sent");
            return;
        }
        match self.actions.purchase(&address, spending).await {
            Ok(hash) => {
                info!(tx = %shared_types::hash_to_hex(&hash), %spending, "Purchase sent");
                if self.commit(epoch, |s| s.purchase_tx = Some(hash)) {
                    self.watch_in(Condition::Purchase, epoch);
                }
            }
            Err(err) if self.is_current(epoch) => {
                warn!(error = %err, "Purchase failed");
                self.workflow.report_error(&err);
                self.workflow.goto(Step::Contribute);
            }
            Err(err) => debug!(error = %err, "Purchase failed after restart"),
        }
    }

    async fn pay_fee(self: &Arc<Self>, epoch: u64) {
        let address = self.session.read().address;
        if !self.is_current(epoch) {
            return;
        }
        let Some(address) = address else {
            self.workflow.report_error(&ReconcileError::NoAccount);
            return;
        };

        self.workflow.goto(Step::FeePayment);
        if !self.is_current(epoch) {
            debug!("Restarted before fee payment was sent");
            return;
        }
        match self.actions.pay_fee(&address).await {
            Ok(hash) => {
                info!(tx = %shared_types::hash_to_hex(&hash), "Fee payment sent");
                if self.commit(epoch, |s| s.fee_tx = Some(hash)) {
                    self.watch_in(Condition::FeePayment, epoch);
                }
            }
            Err(err) if self.is_current(epoch) => {
                warn!(error = %err, "Fee payment failed");
                self.workflow.report_error(&err);
            }
            Err(err) => debug!(error = %err, "Fee payment failed after restart"),
        }
    }

    fn address(&self) -> Result<Address, ReconcileError> {
        self.session.read().address.ok_or(ReconcileError::NoAccount)
    }

    /// Read the account from chain and fold it into the session.
    async fn refresh(&self, epoch: u64, address: &Address) -> Result<AddressState, ReconcileError> {
        let state = self.call(self.reader.get_address_state(address)).await?;
        self.commit(epoch, |s| s.apply(&state));
        Ok(state)
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ReconcileError> {
        match timeout(self.config.call_timeout(), fut).await {
            Ok(result) => result.map_err(ReconcileError::from),
            Err(_) => Err(ReconcileError::Timeout),
        }
    }

    /// Apply `f` to the session unless a restart happened since `epoch`.
    fn commit(&self, epoch: u64, f: impl FnOnce(&mut Session)) -> bool {
        let mut session = self.session.write();
        if !self.is_current(epoch) {
            debug!("Dropping session update from before restart");
            return false;
        }
        f(&mut session);
        true
    }
}

fn stop_watchers(slots: &mut HashMap<Condition, Slot>) -> usize {
    let mut stopped = 0;
    for slot in slots.values_mut() {
        if slot.watcher.take().is_some() {
            slot.state = ConditionState::Stopped;
            stopped += 1;
        }
    }
    stopped
}
