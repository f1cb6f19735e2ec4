//! Payment verification service.

use crate::client::{GatewayClient, RazorpayClient};
use crate::config::GatewayConfig;
use crate::error::PaymentError;
use crate::signature;
use crate::types::{Order, OrderRequest, PaymentConfirmation, VerifiedPayment};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates gateway orders and authenticates client confirmations.
///
/// Holds the gateway client and the signing secret explicitly; a verifier
/// without them degrades to [`PaymentError::GatewayUnavailable`] instead of
/// failing at startup.
#[derive(Clone)]
pub struct PaymentVerifier {
    gateway: Option<Arc<dyn GatewayClient>>,
    secret: Option<SecretString>,
}

impl PaymentVerifier {
    pub fn new(gateway: Option<Arc<dyn GatewayClient>>, secret: Option<SecretString>) -> Self {
        Self { gateway, secret }
    }

    /// A verifier with no gateway and no secret. Every call reports unavailability.
    pub fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Build from configuration using the REST client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, PaymentError> {
        match RazorpayClient::from_config(config)? {
            Some(client) => {
                info!("Payment gateway configured at {}", config.base_url);
                Ok(Self::new(
                    Some(Arc::new(client)),
                    config.key_secret.clone(),
                ))
            }
            None => {
                warn!("Gateway keys not found. Payment features will be disabled.");
                Ok(Self::disabled())
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.gateway.is_some() && self.secret.is_some()
    }

    /// Ask the gateway for a new order.
    pub async fn create_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<Order, PaymentError> {
        let gateway = self.gateway.as_ref().ok_or_else(|| {
            PaymentError::GatewayUnavailable("gateway credentials not configured".into())
        })?;

        if amount == 0 {
            return Err(PaymentError::InvalidPayload(
                "order amount must be positive".into(),
            ));
        }

        let request = OrderRequest {
            amount,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
        };
        let order = gateway.create_order(&request).await?;

        if order.id.is_empty() {
            return Err(PaymentError::InvalidPayload(
                "gateway returned an empty order id".into(),
            ));
        }

        info!(order_id = %order.id, amount, currency, "Gateway order created");
        Ok(order)
    }

    /// Authenticate a confirmation. No partial trust: any mismatch is rejected.
    pub fn verify(&self, confirmation: &PaymentConfirmation) -> Result<VerifiedPayment, PaymentError> {
        let secret = self.secret.as_ref().ok_or_else(|| {
            PaymentError::GatewayUnavailable("gateway secret not configured".into())
        })?;

        if confirmation.order_id.is_empty() || confirmation.transaction_id.is_empty() {
            return Err(PaymentError::InvalidPayload(
                "order_id and transaction_id are required".into(),
            ));
        }

        if let Err(e) = signature::verify(
            secret.expose_secret().as_bytes(),
            &confirmation.order_id,
            &confirmation.transaction_id,
            &confirmation.signature,
        ) {
            warn!(
                order_id = %confirmation.order_id,
                transaction_id = %confirmation.transaction_id,
                "Rejected payment confirmation with invalid signature"
            );
            return Err(e);
        }

        Ok(VerifiedPayment::new(
            confirmation.order_id.clone(),
            confirmation.transaction_id.clone(),
        ))
    }

    /// Gateway health, false when unconfigured.
    pub async fn health_check(&self) -> bool {
        match &self.gateway {
            Some(gateway) => gateway.health_check().await,
            None => false,
        }
    }
}
