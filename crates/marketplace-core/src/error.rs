//! Marketplace error types.

use payment_gateway::PaymentError;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur in marketplace operations.
///
/// Every variant returned from a mutating operation leaves the store exactly
/// as it was before the call.
#[derive(Error, Debug)]
pub enum MarketplaceError {
    /// The ledger cannot cover the requested hours.
    #[error("Hour package exhausted: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Decimal,
        available: Decimal,
    },

    /// The student has no accepted application for the opportunity.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    /// Confirmation signature did not verify.
    #[error("Payment signature mismatch")]
    SignatureMismatch,

    /// Gateway not configured or unreachable.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Hour log has already been rejected.
    #[error("Hour log already rejected")]
    AlreadyRejected,

    /// Caller does not own the resource.
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Certificate requested without any approved hours.
    #[error("No approved hours for this opportunity")]
    NoApprovedHours,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested state change is not allowed from the current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Certification already completed by this student.
    #[error("Already enrolled: {0}")]
    AlreadyEnrolled(String),

    /// Duplicate application to the same opportunity or internship.
    #[error("Already applied: {0}")]
    AlreadyAppliedToListing(String),

    /// Confirmation refers to an order this flow did not create for the caller.
    #[error("Order mismatch: {0}")]
    OrderMismatch(String),

    /// Encryption/decryption error.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Storage I/O error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for MarketplaceError {
    fn from(e: std::io::Error) -> Self {
        MarketplaceError::Storage(e.to_string())
    }
}

impl From<aes_gcm::Error> for MarketplaceError {
    fn from(_: aes_gcm::Error) -> Self {
        MarketplaceError::Encryption("AES-GCM operation failed".to_string())
    }
}

impl From<PaymentError> for MarketplaceError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::SignatureMismatch => MarketplaceError::SignatureMismatch,
            PaymentError::GatewayUnavailable(msg) => MarketplaceError::GatewayUnavailable(msg),
            PaymentError::Config(msg) => MarketplaceError::GatewayUnavailable(msg),
            PaymentError::InvalidPayload(msg) => MarketplaceError::InvalidInput(msg),
            PaymentError::Serialization(e) => MarketplaceError::Serialization(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;
