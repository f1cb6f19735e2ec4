//! Gateway REST client.

use crate::config::GatewayConfig;
use crate::error::PaymentError;
use crate::types::{Order, OrderRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// At most `max` characters of `body`, cut on a char boundary.
fn log_preview(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

/// Order-creation boundary of the payment gateway.
///
/// Injected into [`crate::PaymentVerifier`] so tests and alternative gateways
/// can stand in for the real service.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Create an order for `request.amount` minor units.
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, PaymentError>;

    /// Check if the gateway is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Razorpay-compatible orders API client.
#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayClient {
    /// Create a new client with a bounded request timeout.
    pub fn new(
        key_id: impl Into<String>,
        key_secret: SecretString,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret,
        })
    }

    /// Build a client from configuration, or `None` when credentials are missing.
    pub fn from_config(config: &GatewayConfig) -> Result<Option<Self>, PaymentError> {
        if !config.is_configured() {
            return Ok(None);
        }
        let (Some(key_id), Some(key_secret)) = (&config.key_id, &config.key_secret) else {
            return Ok(None);
        };
        Self::new(key_id.clone(), key_secret.clone(), &config.base_url, config.timeout).map(Some)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            debug!("Gateway response: {}", log_preview(&body, 200));
            return serde_json::from_str(&body)
                .map_err(|e| PaymentError::InvalidPayload(format!("Unexpected gateway response: {}", e)));
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                warn!("Gateway rejected credentials");
                Err(PaymentError::GatewayUnavailable(
                    "gateway rejected credentials".into(),
                ))
            }
            StatusCode::BAD_REQUEST => {
                let message = response.text().await.unwrap_or_default();
                Err(PaymentError::InvalidPayload(message))
            }
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".into());
                Err(PaymentError::GatewayUnavailable(format!(
                    "gateway returned {}: {}",
                    status.as_u16(),
                    message
                )))
            }
        }
    }
}

#[async_trait]
impl GatewayClient for RazorpayClient {
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, PaymentError> {
        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(request)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .query(&[("count", "1")])
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
