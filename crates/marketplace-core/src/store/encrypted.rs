//! Encrypted snapshot storage.
//!
//! The whole marketplace state is serialized to JSON and sealed with
//! AES-256-GCM. File layout: `[12-byte nonce][ciphertext + tag]`.

use super::MarketplaceData;
use crate::error::MarketplaceError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Key derivation path mixed into the storage secret.
const KEY_DERIVATION_PATH: &str = "marketplace/state-snapshot";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// AES-256-GCM file store for [`MarketplaceData`].
pub struct EncryptedStore {
    storage_path: PathBuf,
    key: [u8; 32],
}

impl EncryptedStore {
    /// Create a store whose key is derived from the configured secret.
    pub fn new(storage_path: PathBuf, secret: &SecretString) -> Self {
        Self::with_key(storage_path, derive_key(secret))
    }

    /// Create a store with a known key.
    pub fn with_key(storage_path: PathBuf, key: [u8; 32]) -> Self {
        Self { storage_path, key }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Check if a snapshot file exists.
    pub fn exists(&self) -> bool {
        self.storage_path.exists()
    }

    /// Seal and atomically replace the snapshot.
    pub async fn save(&self, data: &MarketplaceData) -> Result<(), MarketplaceError> {
        let plaintext = serde_json::to_vec(data)?;
        let encrypted = encrypt(&plaintext, &self.key)?;

        if let Some(parent) = self.storage_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.storage_path.with_extension("tmp");
        fs::write(&temp_path, &encrypted).await?;
        fs::rename(&temp_path, &self.storage_path).await?;

        debug!(
            "Saved marketplace snapshot ({} bytes) to {:?}",
            encrypted.len(),
            self.storage_path
        );
        Ok(())
    }

    /// Load the snapshot, or an empty state if none exists yet.
    pub async fn load(&self) -> Result<MarketplaceData, MarketplaceError> {
        if !self.storage_path.exists() {
            info!(
                "Snapshot not found at {:?}, starting fresh",
                self.storage_path
            );
            return Ok(MarketplaceData::default());
        }

        let encrypted = fs::read(&self.storage_path).await?;
        if encrypted.len() < NONCE_SIZE {
            warn!("Snapshot file too short, starting fresh");
            return Ok(MarketplaceData::default());
        }

        let plaintext = decrypt(&encrypted, &self.key).map_err(|_| {
            MarketplaceError::Encryption(
                "Failed to decrypt snapshot. The storage secret may have changed.".to_string(),
            )
        })?;
        let data: MarketplaceData = serde_json::from_slice(&plaintext)?;

        info!(
            "Loaded snapshot: {} ledgers, {} hour logs, {} confirmations",
            data.ledgers.len(),
            data.hour_logs.len(),
            data.confirmations.len()
        );
        Ok(data)
    }
}

fn derive_key(secret: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.expose_secret().as_bytes());
    hasher.update(KEY_DERIVATION_PATH.as_bytes());
    let hash = hasher.finalize();

    let mut key = [0u8; 32];
    key.copy_from_slice(&hash);
    key
}

fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, MarketplaceError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, plaintext)?;

    let mut result = nonce_bytes.to_vec();
    result.extend(ciphertext);
    Ok(result)
}

fn decrypt(encrypted: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, MarketplaceError> {
    if encrypted.len() < NONCE_SIZE {
        return Err(MarketplaceError::Encryption("Data too short".into()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&encrypted[..NONCE_SIZE]);
    Ok(cipher.decrypt(nonce, &encrypted[NONCE_SIZE..])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HourCreditLedger;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    #[test]
    fn test_encryption_round_trip() {
        let key = [0x42u8; 32];
        let data = b"ledger snapshot";

        let encrypted = encrypt(data, &key).unwrap();
        assert_ne!(&encrypted[..], &data[..]);
        assert!(encrypted.len() > data.len());

        assert_eq!(decrypt(&encrypted, &key).unwrap(), data);
    }

    #[test]
    fn test_tamper_detection() {
        let key = [0x42u8; 32];
        let mut encrypted = encrypt(b"hours_used: 10", &key).unwrap();
        if let Some(byte) = encrypted.last_mut() {
            *byte ^= 0xFF;
        }
        assert!(decrypt(&encrypted, &key).is_err());
    }

    #[test]
    fn test_key_depends_on_secret() {
        let a = derive_key(&SecretString::new("one".into()));
        let b = derive_key(&SecretString::new("two".into()));
        assert_ne!(a, b);
        assert_eq!(a, derive_key(&SecretString::new("one".into())));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("state.enc");
        let store = EncryptedStore::new(path.clone(), &SecretString::new("s3cret".into()));

        assert!(!store.exists());
        assert!(store.load().await.unwrap().ledgers.is_empty());

        let mut data = MarketplaceData::default();
        let mut ledger = HourCreditLedger::new("student-1".into());
        ledger.total_hours = Decimal::from(60);
        ledger.recompute_status();
        data.ledgers.insert("student-1".into(), ledger.clone());
        store.save(&data).await.unwrap();

        assert!(store.exists());
        assert!(!path.with_extension("tmp").exists());

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.ledgers.get("student-1"), Some(&ledger));
    }

    #[tokio::test]
    async fn test_load_with_wrong_secret_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.enc");

        let store = EncryptedStore::new(path.clone(), &SecretString::new("right".into()));
        store.save(&MarketplaceData::default()).await.unwrap();

        let other = EncryptedStore::new(path, &SecretString::new("wrong".into()));
        assert!(matches!(
            other.load().await,
            Err(MarketplaceError::Encryption(_))
        ));
    }

    #[tokio::test]
    async fn test_short_file_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.enc");
        tokio::fs::write(&path, b"short").await.unwrap();

        let store = EncryptedStore::with_key(path, [7u8; 32]);
        let data = store.load().await.unwrap();
        assert!(data.ledgers.is_empty());
    }
}
