//! Payment gateway error types.

use thiserror::Error;

/// Errors that can occur while talking to the gateway or verifying a confirmation.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Gateway credentials missing, or the gateway could not be reached in time.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The confirmation signature does not match the recomputed HMAC.
    #[error("Payment signature mismatch")]
    SignatureMismatch,

    /// Malformed request or gateway response.
    #[error("Invalid payment payload: {0}")]
    InvalidPayload(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for PaymentError {
    fn from(e: reqwest::Error) -> Self {
        PaymentError::GatewayUnavailable(e.to_string())
    }
}
