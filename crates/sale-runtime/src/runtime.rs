//! # Runtime
//!
//! Builds every service from a [`SaleConfig`] and supervises the background
//! tasks. Shutdown order: stop accepting HTTP, drain requests, then stop the
//! block poller and the ledger poller.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use shared_bus::{BlockBus, BlockNotifier};
use tokio::sync::watch;
use tracing::{info, warn};
use ts_01_admission_gate::{AdmissionService, InMemoryQuotaStore};
use ts_02_event_ledger::{LedgerApi, LedgerService};
use ts_04_api_gateway::{GatewayService, InMemoryRegistrationStore};

use crate::adapters::JsonRpcChain;
use crate::config::SaleConfig;
use crate::poller::BlockPoller;

/// The assembled backend.
pub struct SaleRuntime {
    bus: Arc<BlockBus>,
    ledger: Arc<LedgerService<JsonRpcChain>>,
    poller: Arc<BlockPoller<JsonRpcChain>>,
    gateway: GatewayService,
}

impl SaleRuntime {
    /// Validate `config` and build all services. Nothing touches the network yet.
    pub fn new(config: SaleConfig) -> Result<Self> {
        config.validate()?;

        let chain = Arc::new(
            JsonRpcChain::new(
                config.rpc_url.clone(),
                config.ledger.contract,
                config.ledger.lookup_timeout(),
            )
            .context("building JSON-RPC client")?,
        );
        let bus = Arc::new(BlockBus::new());
        let poller = Arc::new(BlockPoller::new(
            Arc::clone(&chain),
            Arc::clone(&bus),
            config.poll_interval(),
        ));
        let ledger = Arc::new(LedgerService::new(config.ledger.clone(), chain));
        let admission = Arc::new(AdmissionService::new(
            config.quota.clone(),
            Arc::new(InMemoryQuotaStore::new()),
        ));
        let gateway = GatewayService::new(
            config.gateway.clone(),
            admission,
            Arc::clone(&ledger) as _,
            Arc::new(InMemoryRegistrationStore::new()),
        )
        .context("building HTTP gateway")?;

        Ok(Self {
            bus,
            ledger,
            poller,
            gateway,
        })
    }

    /// Run until `shutdown` resolves or the HTTP server fails.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            bus,
            ledger,
            poller,
            gateway,
        } = self;

        match ledger.bootstrap().await {
            Ok(report) => info!(appended = report.appended, "Ledger bootstrapped"),
            Err(err) => warn!(error = %err, "Ledger bootstrap failed, retrying on next block"),
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let poller_task = {
            let stop = stop_rx.clone();
            tokio::spawn(async move { poller.run(stop).await })
        };
        let ledger_task = {
            let blocks = bus.subscribe();
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.run(blocks, stop_rx).await })
        };

        let served = gateway.serve(shutdown).await;

        let _ = stop_tx.send(true);
        for (name, task) in [("block poller", poller_task), ("ledger", ledger_task)] {
            if let Err(err) = task.await {
                warn!(task = name, error = %err, "Background task ended abnormally");
            }
        }
        info!(
            ledger_entries = ledger.ledger().len(),
            blocks_seen = bus.blocks_published(),
            "Sale backend stopped"
        );
        served.context("HTTP server")
    }
}
