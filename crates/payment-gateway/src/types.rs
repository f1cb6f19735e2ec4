//! Gateway wire types and the verified-payment proof.

use serde::{Deserialize, Serialize};

/// Order creation request. Amounts are in minor units (paise for INR).
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
}

/// Order handle returned by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Opaque gateway order id.
    pub id: String,
    pub amount: u64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Client-supplied confirmation after completing checkout with the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfirmation {
    pub order_id: String,
    /// Gateway payment id.
    pub transaction_id: String,
    /// Lowercase hex HMAC-SHA256 over `order_id|transaction_id`.
    pub signature: String,
}

/// Proof that a confirmation passed signature verification.
///
/// Only [`crate::PaymentVerifier::verify`] can produce one, so anything that
/// takes a `VerifiedPayment` is unreachable without an authentic confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    order_id: String,
    transaction_id: String,
}

impl VerifiedPayment {
    pub(crate) fn new(order_id: String, transaction_id: String) -> Self {
        Self {
            order_id,
            transaction_id,
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}
