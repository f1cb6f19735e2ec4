//! Gateway configuration.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

/// Payment gateway credentials and endpoint.
///
/// Both `key_id` and `key_secret` must be present for payments to be enabled.
/// The secret doubles as the HMAC key for confirmation signatures.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Public key id sent as the basic-auth user.
    pub key_id: Option<String>,

    /// Shared secret (basic-auth password and signature key).
    pub key_secret: Option<SecretString>,

    /// Gateway REST base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound on an order-creation round trip.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_base_url() -> String {
    "https://api.razorpay.com".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            key_secret: None,
            base_url: default_base_url(),
            timeout: default_timeout(),
        }
    }
}

impl GatewayConfig {
    /// True when both credentials are set and non-empty.
    pub fn is_configured(&self) -> bool {
        let has_id = self.key_id.as_deref().is_some_and(|k| !k.is_empty());
        let has_secret = self
            .key_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());
        has_id && has_secret
    }
}
