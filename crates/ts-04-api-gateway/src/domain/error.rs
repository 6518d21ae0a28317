//! # Gateway Errors
//!
//! [`ApiError`] is what handlers return; it renders as
//! `{"error": <code>, "message": <text>}` with a matching status.
//! [`GatewayError`] covers server start-up and shutdown.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shared_types::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use ts_01_admission_gate::AdmissionError;

use crate::ports::outbound::RegistrationError;

/// Error returned by request handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request body or one of its fields is malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The signature does not prove ownership of the address.
    #[error("{0}")]
    Unauthorized(String),

    /// The origin already uses its full address quota.
    #[error("{reason}")]
    RateLimited {
        /// Human-readable reason.
        reason: String,
        /// Time until a slot frees up.
        retry_after: Duration,
    },

    /// A backing store is unreachable.
    #[error("{0}")]
    Unavailable(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Unavailable(_) => "unavailable",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        match (&err, err.kind()) {
            (AdmissionError::QuotaExceeded { retry_after }, _) => ApiError::RateLimited {
                reason: err.to_string(),
                retry_after: *retry_after,
            },
            (AdmissionError::Store(_) | AdmissionError::Timeout(_), _) => {
                ApiError::Unavailable(err.to_string())
            }
            (_, ErrorKind::Input) => ApiError::BadRequest(err.to_string()),
            (_, ErrorKind::Auth) => ApiError::Unauthorized(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        let mut response = (status, body).into_response();

        if let ApiError::RateLimited { retry_after, .. } = &self {
            // Whole seconds, rounded up.
            let secs = retry_after.as_millis().div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Server lifecycle errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid configuration.
    #[error("Invalid gateway configuration: {0}")]
    Config(String),

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: std::net::SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The server failed while running.
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_errors_map_to_statuses() {
        let cases = [
            (
                AdmissionError::MalformedInput("bad hex".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AdmissionError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (
                AdmissionError::QuotaExceeded {
                    retry_after: Duration::from_secs(5),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AdmissionError::Store("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = ApiError::RateLimited {
            reason: "too many".into(),
            retry_after: Duration::from_millis(1_500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn test_quota_reason_is_preserved() {
        let err = ApiError::from(AdmissionError::QuotaExceeded {
            retry_after: Duration::ZERO,
        });
        assert_eq!(
            err.to_string(),
            "you exceeded the number of addresses your IP can use"
        );
    }
}
