//! The marketplace service: shared state, storage and the payment verifier.

use crate::error::Result;
use crate::ledger;
use crate::pricing::PricingConfig;
use crate::store::{MarketplaceData, Store};
use crate::types::HourCreditLedger;
use payment_gateway::PaymentVerifier;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{error, info};

/// Marketplace state behind a single lock.
///
/// Every mutating operation runs its checks and its writes inside one
/// write-lock acquisition and persists the resulting snapshot before the
/// lock is released.
pub struct Marketplace {
    data: RwLock<MarketplaceData>,
    store: Store,
    payments: PaymentVerifier,
    pricing: PricingConfig,
}

impl Marketplace {
    /// Create the service and load any existing snapshot.
    pub async fn new(
        store: Store,
        payments: PaymentVerifier,
        pricing: PricingConfig,
    ) -> Result<Arc<Self>> {
        let data = store.load().await?;
        info!(
            ledgers = data.ledgers.len(),
            opportunities = data.opportunities.len(),
            payments_configured = payments.is_configured(),
            "Marketplace initialized"
        );
        Ok(Arc::new(Self {
            data: RwLock::new(data),
            store,
            payments,
            pricing,
        }))
    }

    /// In-memory marketplace with the given verifier and default pricing.
    pub async fn in_memory(payments: PaymentVerifier) -> Result<Arc<Self>> {
        Self::new(Store::memory(), payments, PricingConfig::default()).await
    }

    pub fn payments(&self) -> &PaymentVerifier {
        &self.payments
    }

    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, MarketplaceData> {
        self.data.read().await
    }

    /// Run `f` under the write lock and persist the result.
    ///
    /// If `f` fails, or the snapshot cannot be saved, the in-memory state is
    /// restored to what it was before the call.
    pub(crate) async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut MarketplaceData) -> Result<T>,
    {
        let mut data = self.data.write().await;
        let snapshot = (*data).clone();

        let value = match f(&mut *data) {
            Ok(value) => value,
            Err(e) => {
                *data = snapshot;
                return Err(e);
            }
        };

        if let Err(e) = self.store.save(&*data).await {
            error!("Failed to persist marketplace snapshot: {}", e);
            *data = snapshot;
            return Err(e);
        }

        Ok(value)
    }

    /// Current ledger for a student, created empty on first access.
    pub async fn ledger(&self, student: &str) -> Result<HourCreditLedger> {
        if let Some(ledger) = self.read().await.ledgers.get(student) {
            return Ok(ledger.clone());
        }
        self.mutate(|data| Ok(ledger::get_or_create(data, student).clone()))
            .await
    }

    /// Summary counts.
    pub async fn stats(&self) -> MarketplaceStats {
        let data = self.read().await;
        MarketplaceStats {
            ledgers: data.ledgers.len(),
            hour_logs: data.hour_logs.len(),
            opportunities: data.opportunities.len(),
            confirmations: data.confirmations.len(),
        }
    }
}

/// Summary statistics for the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketplaceStats {
    pub ledgers: usize,
    pub hour_logs: usize,
    pub opportunities: usize,
    pub confirmations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketplaceError;
    use crate::types::LedgerStatus;
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ledger_created_lazily() {
        let market = Marketplace::in_memory(PaymentVerifier::disabled())
            .await
            .unwrap();

        let ledger = market.ledger("s1").await.unwrap();
        assert_eq!(ledger.status, LedgerStatus::Exhausted);
        assert_eq!(market.stats().await.ledgers, 1);

        let again = market.ledger("s1").await.unwrap();
        assert_eq!(again.created_at, ledger.created_at);
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_persistent_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::encrypted(
            temp_dir.path().join("state.enc"),
            &SecretString::new("k".into()),
        );
        let market = Marketplace::new(store, PaymentVerifier::disabled(), PricingConfig::default())
            .await
            .unwrap();

        let result: Result<()> = market
            .mutate(|data| {
                ledger::get_or_create(data, "s1").hours_used = Decimal::from(3);
                Err(MarketplaceError::Internal("boom".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(market.read().await.ledgers.is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_rolls_back_memory_state() {
        let market = Marketplace::in_memory(PaymentVerifier::disabled())
            .await
            .unwrap();
        market.ledger("s1").await.unwrap();

        let result: Result<()> = market
            .mutate(|data| {
                ledger::get_or_create(data, "s1").hours_used = Decimal::from(3);
                ledger::get_or_create(data, "s2");
                Err(MarketplaceError::Internal("boom".into()))
            })
            .await;

        assert!(result.is_err());
        let data = market.read().await;
        assert_eq!(data.ledgers.len(), 1);
        assert_eq!(data.ledgers["s1"].hours_used, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.enc");
        let secret = SecretString::new("restart-secret".into());

        {
            let market = Marketplace::new(
                Store::encrypted(path.clone(), &secret),
                PaymentVerifier::disabled(),
                PricingConfig::default(),
            )
            .await
            .unwrap();
            market.ledger("s1").await.unwrap();
        }

        let market = Marketplace::new(
            Store::encrypted(path, &secret),
            PaymentVerifier::disabled(),
            PricingConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(market.stats().await.ledgers, 1);
    }
}
