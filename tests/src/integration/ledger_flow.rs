//! # Ledger Flow
//!
//! Chain head polling feeds the block bus, the ledger follows it, and the
//! gateway serves the result as chart data.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use sale_runtime::poller::BlockPoller;
    use shared_bus::{BlockBus, BlockNotifier};
    use shared_types::{Address, ChartPoint, EventKind, RawEvent, U256};
    use tokio::sync::watch;
    use tokio::task::JoinHandle;
    use tower::ServiceExt;
    use ts_01_admission_gate::{AdmissionService, InMemoryQuotaStore, QuotaConfig};
    use ts_02_event_ledger::{
        check_ledger_invariants, LedgerApi, LedgerConfig, LedgerService, MockChain,
    };
    use ts_04_api_gateway::{GatewayConfig, GatewayService, InMemoryRegistrationStore};

    const SALE: Address = [0x5a; 20];
    const OTHER: Address = [0x0b; 20];

    struct Pipeline {
        chain: Arc<MockChain>,
        ledger: Arc<LedgerService<MockChain>>,
        stop: watch::Sender<bool>,
        tasks: Vec<JoinHandle<()>>,
    }

    impl Pipeline {
        fn start(chain: Arc<MockChain>) -> Self {
            let bus = Arc::new(BlockBus::new());
            let ledger = Arc::new(LedgerService::new(
                LedgerConfig {
                    contract: SALE,
                    from_block: 1,
                    ..Default::default()
                },
                chain.clone(),
            ));
            let poller = BlockPoller::new(chain.clone(), bus.clone(), Duration::from_millis(10));
            let (stop, stop_rx) = watch::channel(false);

            let blocks = bus.subscribe();
            let poll_stop = stop_rx.clone();
            let follower = ledger.clone();
            let tasks = vec![
                tokio::spawn(async move { poller.run(poll_stop).await }),
                tokio::spawn(async move { follower.run(blocks, stop_rx).await }),
            ];
            Self {
                chain,
                ledger,
                stop,
                tasks,
            }
        }

        async fn shutdown(self) {
            self.stop.send(true).unwrap();
            for task in self.tasks {
                task.await.unwrap();
            }
        }
    }

    fn buyin(block: u64, index: u64, accounted: u64) -> RawEvent {
        RawEvent::mined(SALE, block, index, EventKind::Buyin, U256::from(accounted))
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
    async fn test_ledger_follows_chain_and_serves_chart() {
        let chain = Arc::new(MockChain::new());
        chain.push_log(buyin(3, 0, 100));
        chain.push_log(buyin(3, 1, 50));
        chain.push_log(RawEvent::mined(OTHER, 4, 0, EventKind::Buyin, U256::from(9_999u64)));
        chain.push_log(RawEvent::mined(SALE, 5, 0, EventKind::Injected, U256::from(25u64)));

        let pipeline = Pipeline::start(chain.clone());
        eventually("bootstrap", || pipeline.ledger.ledger().len() == 2).await;

        let ledger = pipeline.ledger.ledger();
        assert_eq!(ledger.entries()[0].total_accounted, U256::from(150u64));
        assert_eq!(ledger.entries()[1].total_accounted, U256::from(175u64));
        assert_eq!(ledger.entries()[1].timestamp, chain.timestamp_of(5));

        chain.push_log(buyin(8, 0, 25));
        eventually("next block", || pipeline.ledger.ledger().len() == 3).await;
        assert_eq!(pipeline.ledger.ledger().total(), U256::from(200u64));
        check_ledger_invariants(&pipeline.ledger.ledger()).unwrap();

        let admission = Arc::new(AdmissionService::new(
            QuotaConfig::default(),
            Arc::new(InMemoryQuotaStore::new()),
        ));
        let gateway = GatewayService::new(
            GatewayConfig::default(),
            admission,
            pipeline.ledger.clone(),
            Arc::new(InMemoryRegistrationStore::new()),
        )
        .unwrap();
        let response = gateway
            .router()
            .oneshot(Request::get("/chart-data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let served: Vec<ChartPoint> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(served, pipeline.ledger.chart_data());

        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_lookup_is_retried_on_next_head() {
        let chain = Arc::new(MockChain::new());
        chain.push_log(buyin(2, 0, 10));
        let pipeline = Pipeline::start(chain.clone());
        eventually("bootstrap", || pipeline.ledger.ledger().len() == 1).await;

        chain.fail_block(6);
        chain.push_log(buyin(6, 0, 5));
        eventually("failed merge", || pipeline.ledger.failed_merges() > 0).await;
        assert_eq!(pipeline.ledger.ledger().len(), 1);
        assert_eq!(pipeline.ledger.cursor(), Some(2));

        chain.heal_block(6);
        chain.set_head(7);
        eventually("recovered", || pipeline.ledger.ledger().len() == 2).await;
        assert_eq!(pipeline.ledger.ledger().total(), U256::from(15u64));
        assert_eq!(pipeline.ledger.cursor(), Some(7));

        pipeline.shutdown().await;
    }
}
