//! Marketplace state snapshot and its storage backends.

mod encrypted;

pub use encrypted::EncryptedStore;

use crate::error::MarketplaceError;
use crate::orders::{ConfirmationRecord, PendingOrder};
use crate::types::{
    Application, Certification, HourCreditLedger, HourLogEntry, InternshipApplication,
    InternshipListing, Opportunity, UserCertification, UserId, UserProfile,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Data version for schema migrations.
const DATA_VERSION: u32 = 1;

/// Everything the marketplace persists, saved as one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceData {
    /// Schema version for migrations.
    pub version: u32,
    /// Hour-credit ledgers keyed by student.
    pub ledgers: HashMap<UserId, HourCreditLedger>,
    pub hour_logs: HashMap<String, HourLogEntry>,
    pub profiles: HashMap<UserId, UserProfile>,
    pub opportunities: HashMap<String, Opportunity>,
    pub applications: HashMap<String, Application>,
    pub internships: HashMap<String, InternshipListing>,
    pub internship_applications: HashMap<String, InternshipApplication>,
    pub certifications: HashMap<String, Certification>,
    pub user_certifications: HashMap<String, UserCertification>,
    /// Orders created with the gateway, keyed by gateway order id.
    pub pending_orders: HashMap<String, PendingOrder>,
    /// Applied confirmations, keyed by gateway order id.
    pub confirmations: HashMap<String, ConfirmationRecord>,
}

impl Default for MarketplaceData {
    fn default() -> Self {
        Self {
            version: DATA_VERSION,
            ledgers: HashMap::new(),
            hour_logs: HashMap::new(),
            profiles: HashMap::new(),
            opportunities: HashMap::new(),
            applications: HashMap::new(),
            internships: HashMap::new(),
            internship_applications: HashMap::new(),
            certifications: HashMap::new(),
            user_certifications: HashMap::new(),
            pending_orders: HashMap::new(),
            confirmations: HashMap::new(),
        }
    }
}

/// In-memory only; nothing survives a restart.
pub struct MemoryStore;

impl MemoryStore {
    pub async fn save(&self, _data: &MarketplaceData) -> Result<(), MarketplaceError> {
        debug!("Memory store: save is a no-op");
        Ok(())
    }

    pub async fn load(&self) -> Result<MarketplaceData, MarketplaceError> {
        debug!("Memory store: returning empty state");
        Ok(MarketplaceData::default())
    }
}

/// Storage backend for the marketplace snapshot.
pub enum Store {
    /// AES-256-GCM encrypted file
    Encrypted(EncryptedStore),
    /// In-memory only (no persistence)
    Memory(MemoryStore),
}

impl Store {
    /// Encrypted store when a secret is configured, otherwise memory store.
    pub fn new(storage_path: PathBuf, secret: Option<&SecretString>) -> Self {
        match secret {
            Some(secret) => {
                info!("Using encrypted persistent storage at {:?}", storage_path);
                Store::Encrypted(EncryptedStore::new(storage_path, secret))
            }
            None => {
                warn!("No storage secret configured, using in-memory storage (data will be lost on restart)");
                Store::Memory(MemoryStore)
            }
        }
    }

    pub fn encrypted(storage_path: PathBuf, secret: &SecretString) -> Self {
        Store::Encrypted(EncryptedStore::new(storage_path, secret))
    }

    pub fn memory() -> Self {
        Store::Memory(MemoryStore)
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Store::Encrypted(_))
    }

    pub async fn save(&self, data: &MarketplaceData) -> Result<(), MarketplaceError> {
        match self {
            Store::Encrypted(s) => s.save(data).await,
            Store::Memory(s) => s.save(data).await,
        }
    }

    pub async fn load(&self) -> Result<MarketplaceData, MarketplaceError> {
        match self {
            Store::Encrypted(s) => s.load().await,
            Store::Memory(s) => s.load().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_does_not_persist() {
        let store = Store::memory();
        assert!(!store.is_persistent());

        let mut data = MarketplaceData::default();
        data.ledgers
            .insert("s".into(), HourCreditLedger::new("s".into()));
        store.save(&data).await.unwrap();

        assert!(store.load().await.unwrap().ledgers.is_empty());
    }

    #[test]
    fn test_store_selection() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.enc");

        assert!(!Store::new(path.clone(), None).is_persistent());
        let secret = SecretString::new("k".into());
        assert!(Store::new(path, Some(&secret)).is_persistent());
    }

    #[test]
    fn test_missing_sections_default() {
        let data: MarketplaceData = serde_json::from_str(r#"{"version":1}"#).unwrap();
        assert!(data.confirmations.is_empty());
        assert_eq!(data.version, DATA_VERSION);
    }
}
