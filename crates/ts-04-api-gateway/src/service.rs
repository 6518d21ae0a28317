//! # Gateway Service
//!
//! Builds the router and runs the HTTP server until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use ts_01_admission_gate::AdmissionApi;
use ts_02_event_ledger::LedgerApi;

use crate::domain::config::GatewayConfig;
use crate::domain::error::GatewayError;
use crate::handlers::{chart_data, health, register};
use crate::middleware::client_ip::TrustedProxies;
use crate::ports::outbound::RegistrationStore;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<dyn AdmissionApi>,
    pub ledger: Arc<dyn LedgerApi>,
    pub registrations: Arc<dyn RegistrationStore>,
    /// Message contributors must sign.
    pub challenge: Arc<str>,
    pub trusted_proxies: TrustedProxies,
}

impl FromRef<AppState> for TrustedProxies {
    fn from_ref(state: &AppState) -> Self {
        state.trusted_proxies.clone()
    }
}

/// Router with every route and the middleware stack.
pub fn build_router(state: AppState, config: &GatewayConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(config.request_timeout()));

    Router::new()
        .route("/register", post(register))
        .route("/chart-data", get(chart_data))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(middleware)
        .with_state(state)
}

/// HTTP server for the sale backend.
pub struct GatewayService {
    config: GatewayConfig,
    state: AppState,
}

impl GatewayService {
    /// Create the service; fails on invalid configuration.
    pub fn new(
        config: GatewayConfig,
        admission: Arc<dyn AdmissionApi>,
        ledger: Arc<dyn LedgerApi>,
        registrations: Arc<dyn RegistrationStore>,
    ) -> Result<Self, GatewayError> {
        config.validate().map_err(GatewayError::Config)?;
        let state = AppState {
            admission,
            ledger,
            registrations,
            challenge: Arc::from(config.challenge.as_str()),
            trusted_proxies: TrustedProxies(Arc::from(config.trusted_proxies.clone())),
        };
        Ok(Self { config, state })
    }

    /// Router serving this service's state.
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| GatewayError::Bind { addr, source })?;
        info!(addr = %addr, "Starting HTTP server");

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}
