//! # Route Handlers

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use shared_types::{address_to_hex, ChartPoint};
use tracing::{info, warn};
use ts_01_admission_gate::SignedClaim;

use crate::domain::error::ApiError;
use crate::domain::types::{RegisterRequest, RegisterResponse};
use crate::middleware::client_ip::ClientIp;
use crate::service::AppState;

/// `POST /register`: verify the signed challenge, charge the origin's
/// quota with the verified address and record the registration.
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let origin = ip.to_string();

    let claim = SignedClaim {
        claimed_address: request.address,
        message: state.challenge.to_string(),
        signature: request.signature,
    };
    let address = state.admission.admit(&origin, &claim).await.map_err(|err| {
        warn!(origin = %origin, error = %err, "Registration refused");
        ApiError::from(err)
    })?;

    state.registrations.register(&address, &origin).await?;

    let address = address_to_hex(&address);
    info!(origin = %origin, address = %address, "Address registered");
    Ok(Json(RegisterResponse {
        address,
        registered: true,
    }))
}

/// `GET /chart-data`: cumulative accounted total per block.
pub async fn chart_data(State(state): State<AppState>) -> Json<Vec<ChartPoint>> {
    Json(state.ledger.chart_data())
}

/// `GET /health`.
pub async fn health() -> &'static str {
    "ok"
}
