//! Hour package purchase.

use crate::error::Result;
use crate::ledger;
use crate::marketplace::Marketplace;
use crate::orders::{apply_once, Checkout, OrderPurpose, PaymentOutcome};
use crate::types::{HourCreditLedger, LedgerTransaction};
use crate::MarketplaceError;
use chrono::Utc;
use payment_gateway::PaymentConfirmation;
use tracing::info;

impl Marketplace {
    /// Open an order for the configured hour package.
    pub async fn purchase_package(&self, student: &str) -> Result<Checkout> {
        let pricing = self.pricing();
        let purpose = OrderPurpose::HourPackage {
            hours: pricing.package_hours(),
        };
        let checkout = self
            .open_order(student, purpose, pricing.package_amount())
            .await?;

        info!(
            student = %student,
            order_id = %checkout.order_id,
            hours = pricing.package_hours,
            "Package order created"
        );
        Ok(checkout)
    }

    /// Verify a package payment and credit the ledger exactly once.
    pub async fn confirm_package(
        &self,
        student: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<PaymentOutcome<HourCreditLedger>> {
        let payment = self.payments().verify(confirmation)?;

        self.mutate(|data| {
            let applied = apply_once(
                data,
                student,
                &payment,
                |purpose| matches!(purpose, OrderPurpose::HourPackage { .. }),
                |data, order| {
                    let OrderPurpose::HourPackage { hours } = &order.purpose else {
                        return Err(MarketplaceError::OrderMismatch(
                            "not a package order".into(),
                        ));
                    };
                    ledger::credit(
                        data,
                        student,
                        LedgerTransaction {
                            payment_ref: payment.transaction_id().to_string(),
                            order_id: order.order_id.clone(),
                            amount: order.amount,
                            currency: order.currency.clone(),
                            hours_added: *hours,
                            timestamp: Utc::now(),
                        },
                    )
                },
            )?;

            Ok(match applied {
                Some(ledger) => PaymentOutcome::Applied(ledger),
                None => PaymentOutcome::AlreadyApplied(ledger::get_or_create(data, student).clone()),
            })
        })
        .await
    }
}
