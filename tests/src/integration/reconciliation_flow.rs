//! # Reconciliation Flow
//!
//! Condition watchers driven by real chain-head polling rather than by
//! publishing on the bus by hand.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sale_runtime::poller::BlockPoller;
    use shared_bus::BlockBus;
    use shared_types::{AddressState, TxStatus, U256};
    use tokio::sync::watch;
    use ts_02_event_ledger::MockChain;
    use ts_03_reconciliation::{
        Condition, ConditionState, MockAccountReader, ReconcileApi, ReconcileConfig, Reconciler,
        RecordingActions, RecordingWorkflow, Step, Workflow,
    };

    const ALICE: [u8; 20] = [0xa1; 20];

    struct Session {
        chain: Arc<MockChain>,
        bus: Arc<BlockBus>,
        reader: Arc<MockAccountReader>,
        actions: Arc<RecordingActions>,
        workflow: Arc<RecordingWorkflow>,
        reconciler: Reconciler,
        stop: watch::Sender<bool>,
    }

    impl Session {
        fn start(step: Step) -> Self {
            let chain = Arc::new(MockChain::new());
            let bus = Arc::new(BlockBus::new());
            let reader = Arc::new(MockAccountReader::new());
            let actions = Arc::new(RecordingActions::new());
            let workflow = Arc::new(RecordingWorkflow::starting_at(step));
            let config = ReconcileConfig {
                gas_price: U256::from(1u64),
                fee: U256::from(1_000u64),
                ..Default::default()
            };
            let reconciler = Reconciler::new(
                config,
                reader.clone(),
                actions.clone(),
                workflow.clone(),
                bus.clone(),
            );
            reconciler.set_account(ALICE, true);

            let (stop, stop_rx) = watch::channel(false);
            let poller = BlockPoller::new(chain.clone(), bus.clone(), Duration::from_millis(10));
            tokio::spawn(async move { poller.run(stop_rx).await });

            Self {
                chain,
                bus,
                reader,
                actions,
                workflow,
                reconciler,
                stop,
            }
        }

        fn mine(&self) {
            let next = self.bus.head().unwrap_or(0) + 1;
            self.chain.set_head(next);
        }
    }

    impl Drop for Session {
        fn drop(&mut self) {
            let _ = self.stop.send(true);
        }
    }

    async fn eventually(what: &str, check: impl Fn() -> bool) {
        for _ in 0..300 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[tokio::test]
    async fn test_certified_contributor_reaches_summary() {
        let s = Session::start(Step::Picops);
        s.reconciler.set_spending(U256::from(2_000_000u64));
        s.reader.set_state(AddressState {
            balance: U256::from(5_000_000u64),
            ..Default::default()
        });

        s.reconciler.watch(Condition::Certification);
        eventually("first read", || s.reader.state_reads() >= 1).await;
        assert_eq!(
            s.reconciler.state(Condition::Certification),
            ConditionState::Watching
        );

        s.reader.update_state(|state| state.certified = true);
        s.mine();
        eventually("purchase", || s.actions.purchases().len() == 1).await;
        assert_eq!(s.workflow.current_step(), Step::Purchase);

        s.reader.set_receipt(
            RecordingActions::tx_hash(1),
            TxStatus::Success {
                accounted: U256::from(2_200_000u64),
                received: U256::from(2_000_000u64),
            },
        );
        s.mine();
        eventually("summary", || s.workflow.current_step() == Step::Summary).await;

        assert_eq!(s.reconciler.outcome().unwrap().bonus_percent(), Some(10));
        assert!(s.reconciler.watching().is_empty());
        eventually("unsubscribed", || s.bus.subscriber_count() == 0).await;
    }

    #[tokio::test]
    async fn test_restart_while_waiting_for_funds() {
        let s = Session::start(Step::Contribute);
        s.reconciler.set_spending(U256::from(1_000_000u64));

        s.reconciler.watch(Condition::Payment);
        eventually("revisit", || s.workflow.history() == vec![Step::Payment]).await;
        assert_eq!(s.bus.subscriber_count(), 1);

        s.reconciler.restart();
        assert!(s.reconciler.watching().is_empty());
        assert_eq!(s.workflow.current_step(), Step::ImportantNotice);

        s.reader.update_state(|state| state.balance = U256::from(10_000_000u64));
        s.mine();
        eventually("bus drained", || s.bus.subscriber_count() == 0).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(s.actions.purchases().is_empty());
        assert!(s.actions.fee_payments().is_empty());
        assert!(s.reconciler.session().address.is_none());
    }
}
