//! # Sale Backend
//!
//! Entry point. Logging honours `RUST_LOG` (default `info`); configuration
//! comes from `SALE_*` environment variables.

use anyhow::{Context, Result};
use sale_runtime::{load_config, SaleRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config();
    config.validate().context("invalid configuration")?;

    let runtime = SaleRuntime::new(config)?;
    info!("Sale backend starting. Press Ctrl+C to stop.");
    runtime
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
}
