//! Error types for the marketplace API.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use marketplace_core::MarketplaceError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error("Missing caller identity: {0}")]
    Unauthenticated(String),

    #[error("Role {0} may not call this endpoint")]
    Forbidden(String),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Marketplace(e) => match e {
                MarketplaceError::InsufficientBalance { .. } => {
                    (StatusCode::PAYMENT_REQUIRED, "PACKAGE_EXHAUSTED")
                }
                MarketplaceError::NotEligible(_) => (StatusCode::FORBIDDEN, "NOT_ELIGIBLE"),
                MarketplaceError::SignatureMismatch => {
                    (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE")
                }
                MarketplaceError::GatewayUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE")
                }
                MarketplaceError::AlreadyRejected => (StatusCode::CONFLICT, "ALREADY_REJECTED"),
                MarketplaceError::NotAuthorized(_) => (StatusCode::UNAUTHORIZED, "NOT_AUTHORIZED"),
                MarketplaceError::NoApprovedHours => (StatusCode::BAD_REQUEST, "NO_APPROVED_HOURS"),
                MarketplaceError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                MarketplaceError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                MarketplaceError::InvalidTransition(_) => {
                    (StatusCode::CONFLICT, "INVALID_TRANSITION")
                }
                MarketplaceError::AlreadyEnrolled(_) => (StatusCode::CONFLICT, "ALREADY_ENROLLED"),
                MarketplaceError::AlreadyAppliedToListing(_) => {
                    (StatusCode::CONFLICT, "ALREADY_APPLIED_TO_LISTING")
                }
                MarketplaceError::OrderMismatch(_) => (StatusCode::BAD_REQUEST, "ORDER_MISMATCH"),
                MarketplaceError::Encryption(_)
                | MarketplaceError::Storage(_)
                | MarketplaceError::Serialization(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                }
                MarketplaceError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "NOT_AUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::InvalidBody(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!(code, "Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn status(e: impl Into<ApiError>) -> (StatusCode, &'static str) {
        e.into().status_and_code()
    }

    #[test]
    fn test_ledger_errors() {
        assert_eq!(
            status(MarketplaceError::InsufficientBalance {
                requested: Decimal::from(5),
                available: Decimal::ZERO,
            }),
            (StatusCode::PAYMENT_REQUIRED, "PACKAGE_EXHAUSTED")
        );
        assert_eq!(
            status(MarketplaceError::NotEligible("no application".into())),
            (StatusCode::FORBIDDEN, "NOT_ELIGIBLE")
        );
        assert_eq!(
            status(MarketplaceError::AlreadyRejected),
            (StatusCode::CONFLICT, "ALREADY_REJECTED")
        );
    }

    #[test]
    fn test_payment_errors() {
        assert_eq!(
            status(MarketplaceError::SignatureMismatch),
            (StatusCode::BAD_REQUEST, "INVALID_SIGNATURE")
        );
        assert_eq!(
            status(MarketplaceError::GatewayUnavailable("down".into())),
            (StatusCode::SERVICE_UNAVAILABLE, "GATEWAY_UNAVAILABLE")
        );
        assert_eq!(
            status(MarketplaceError::OrderMismatch("order_1".into())),
            (StatusCode::BAD_REQUEST, "ORDER_MISMATCH")
        );
    }

    #[test]
    fn test_storage_errors_are_internal() {
        assert_eq!(
            status(MarketplaceError::Storage("disk full".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(MarketplaceError::Encryption("bad tag".into())).1,
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn test_identity_errors() {
        assert_eq!(
            ApiError::Unauthenticated("x-user-id".into()).status_and_code(),
            (StatusCode::UNAUTHORIZED, "NOT_AUTHORIZED")
        );
        assert_eq!(
            ApiError::Forbidden("ngo".into()).status_and_code(),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
        assert_eq!(
            ApiError::RateLimitExceeded.status_and_code(),
            (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
        );
    }
}
