//! Payment gateway integration.
//!
//! Creates orders with a Razorpay-compatible gateway and verifies the
//! HMAC-signed confirmations clients send back after checkout.
//!
//! ```text
//! create_order → client pays at gateway → PaymentConfirmation → verify → VerifiedPayment
//! ```
//!
//! A [`VerifiedPayment`] is the only way into a paid state transition; it
//! cannot be built outside this crate.

mod client;
mod config;
mod error;
pub mod signature;
mod types;
mod verifier;

pub use client::{GatewayClient, RazorpayClient};
pub use config::GatewayConfig;
pub use error::PaymentError;
pub use types::{Order, OrderRequest, PaymentConfirmation, VerifiedPayment};
pub use verifier::PaymentVerifier;

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &str = "test_key_secret";

    fn test_verifier(mock_server: &MockServer, timeout: Duration) -> PaymentVerifier {
        let client = RazorpayClient::new(
            "rzp_test_key",
            SecretString::new(SECRET.into()),
            mock_server.uri(),
            timeout,
        )
        .unwrap();
        PaymentVerifier::new(Some(Arc::new(client)), Some(SecretString::new(SECRET.into())))
    }

    fn confirmation(order_id: &str, transaction_id: &str, signature: String) -> PaymentConfirmation {
        PaymentConfirmation {
            order_id: order_id.into(),
            transaction_id: transaction_id.into(),
            signature,
        }
    }

    #[tokio::test]
    async fn test_create_order_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .and(header_exists("Authorization"))
            .and(body_json(serde_json::json!({
                "amount": 100000,
                "currency": "INR",
                "receipt": "pkg_student1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "order_O1",
                "entity": "order",
                "amount": 100000,
                "currency": "INR",
                "receipt": "pkg_student1",
                "status": "created"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let verifier = test_verifier(&mock_server, Duration::from_secs(5));
        let order = verifier
            .create_order(100_000, "INR", "pkg_student1")
            .await
            .unwrap();

        assert_eq!(order.id, "order_O1");
        assert_eq!(order.amount, 100_000);
        assert_eq!(order.status.as_deref(), Some("created"));
    }

    #[tokio::test]
    async fn test_create_order_non_ascii_response_with_debug_logging() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        // The first multi-byte character starts at byte 199 and ends past 200.
        let prefix = r#"{"id":"order_U1","amount":5000,"currency":"INR","receipt":""#;
        let body = format!("{}{}é\"}}", prefix, "x".repeat(199 - prefix.len()));

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let verifier = test_verifier(&mock_server, Duration::from_secs(5));
        let order = verifier.create_order(5_000, "INR", "cert_s1").await.unwrap();

        assert_eq!(order.id, "order_U1");
        assert!(order.receipt.unwrap().ends_with('é'));
    }

    #[tokio::test]
    async fn test_create_order_server_error_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let verifier = test_verifier(&mock_server, Duration::from_secs(5));
        let result = verifier.create_order(50_000, "INR", "intern_a1").await;

        assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));
    }

    #[tokio::test]
    async fn test_create_order_timeout_is_unavailable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/orders"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(serde_json::json!({"id": "late", "amount": 1, "currency": "INR"})),
            )
            .mount(&mock_server)
            .await;

        let verifier = test_verifier(&mock_server, Duration::from_millis(50));
        let result = verifier.create_order(100, "INR", "r").await;

        assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_verifier_degrades() {
        let verifier = PaymentVerifier::from_config(&GatewayConfig::default()).unwrap();
        assert!(!verifier.is_configured());

        let result = verifier.create_order(100, "INR", "r").await;
        assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));

        let result = verifier.verify(&confirmation("o", "p", "00".into()));
        assert!(matches!(result, Err(PaymentError::GatewayUnavailable(_))));
        assert!(!verifier.health_check().await);
    }

    #[tokio::test]
    async fn test_verify_accepts_authentic_confirmation() {
        let mock_server = MockServer::start().await;
        let verifier = test_verifier(&mock_server, Duration::from_secs(5));

        let sig = signature::sign(SECRET.as_bytes(), "order_O1", "pay_P1").unwrap();
        let verified = verifier
            .verify(&confirmation("order_O1", "pay_P1", sig))
            .unwrap();

        assert_eq!(verified.order_id(), "order_O1");
        assert_eq!(verified.transaction_id(), "pay_P1");
    }

    #[tokio::test]
    async fn test_verify_rejects_forgery() {
        let mock_server = MockServer::start().await;
        let verifier = test_verifier(&mock_server, Duration::from_secs(5));

        let forged = signature::sign(b"attacker", "order_O1", "pay_P1").unwrap();
        let result = verifier.verify(&confirmation("order_O1", "pay_P1", forged));
        assert!(matches!(result, Err(PaymentError::SignatureMismatch)));

        let sig = signature::sign(SECRET.as_bytes(), "order_O1", "pay_P1").unwrap();
        let result = verifier.verify(&confirmation("order_O2", "pay_P1", sig));
        assert!(matches!(result, Err(PaymentError::SignatureMismatch)));
    }

    #[test]
    fn test_confirmation_rejects_unknown_fields() {
        let json = r#"{"order_id":"o","transaction_id":"p","signature":"s","hours":600}"#;
        assert!(serde_json::from_str::<PaymentConfirmation>(json).is_err());
    }
}
