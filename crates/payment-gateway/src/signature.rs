//! HMAC-SHA256 confirmation signatures.
//!
//! The gateway signs `order_id + "|" + transaction_id` with the merchant
//! secret and hex-encodes the digest.

use crate::error::PaymentError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &[u8], order_id: &str, transaction_id: &str) -> Result<HmacSha256, PaymentError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| PaymentError::Config(format!("Invalid HMAC key: {}", e)))?;
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(transaction_id.as_bytes());
    Ok(mac)
}

/// Compute the lowercase hex signature for an order/transaction pair.
pub fn sign(secret: &[u8], order_id: &str, transaction_id: &str) -> Result<String, PaymentError> {
    let mac = mac_for(secret, order_id, transaction_id)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a supplied signature against the recomputed one.
///
/// Comparison happens on the decoded digest in constant time. Anything that
/// is not the exact lowercase hex encoding is a mismatch.
pub fn verify(
    secret: &[u8],
    order_id: &str,
    transaction_id: &str,
    signature: &str,
) -> Result<(), PaymentError> {
    if signature.bytes().any(|b| b.is_ascii_uppercase()) {
        return Err(PaymentError::SignatureMismatch);
    }
    let provided = hex::decode(signature).map_err(|_| PaymentError::SignatureMismatch)?;

    mac_for(secret, order_id, transaction_id)?
        .verify_slice(&provided)
        .map_err(|_| PaymentError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret";

    #[test]
    fn test_sign_is_deterministic_hex() {
        let a = sign(SECRET, "order_1", "pay_1").unwrap();
        let b = sign(SECRET, "order_1", "pay_1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_verify_roundtrip() {
        let sig = sign(SECRET, "order_1", "pay_1").unwrap();
        assert!(verify(SECRET, "order_1", "pay_1", &sig).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let sig = sign(b"other_secret", "order_1", "pay_1").unwrap();
        assert!(matches!(
            verify(SECRET, "order_1", "pay_1", &sig),
            Err(PaymentError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_tampered_ids_rejected() {
        let sig = sign(SECRET, "order_1", "pay_1").unwrap();
        assert!(verify(SECRET, "order_2", "pay_1", &sig).is_err());
        assert!(verify(SECRET, "order_1", "pay_2", &sig).is_err());
        assert!(verify(SECRET, "order_1|pay", "_1", &sig).is_err());
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let sig = sign(SECRET, "order_1", "pay_1").unwrap();
        assert!(verify(SECRET, "order_1", "pay_1", "not-hex").is_err());
        assert!(verify(SECRET, "order_1", "pay_1", "").is_err());
        assert!(verify(SECRET, "order_1", "pay_1", &sig[..62]).is_err());
        assert!(verify(SECRET, "order_1", "pay_1", &sig.to_uppercase()).is_err());
    }
}
