//! Order book and exactly-once application of verified payments.
//!
//! Every gateway order this service creates is recorded as a
//! [`PendingOrder`] carrying the purchase it pays for. A confirmation is only
//! honored against that record, so the amount and purpose never come from
//! the client.

use crate::error::{MarketplaceError, Result};
use crate::marketplace::Marketplace;
use crate::store::MarketplaceData;
use crate::types::{PaymentDetails, UserId};
use chrono::{DateTime, Utc};
use payment_gateway::VerifiedPayment;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What an order pays for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderPurpose {
    HourPackage { hours: Decimal },
    Internship { application_id: String },
    Certification { certification_id: String },
}

impl OrderPurpose {
    fn receipt_prefix(&self) -> &'static str {
        match self {
            OrderPurpose::HourPackage { .. } => "pkg",
            OrderPurpose::Internship { .. } => "intern",
            OrderPurpose::Certification { .. } => "cert",
        }
    }
}

/// An order created with the gateway and not yet known to be paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub order_id: String,
    pub student: UserId,
    pub purpose: OrderPurpose,
    /// Minor units.
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub created_at: DateTime<Utc>,
}

/// A confirmation that has been applied. At most one per order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub order_id: String,
    pub transaction_id: String,
    pub student: UserId,
    pub purpose: OrderPurpose,
    pub amount: u64,
    pub currency: String,
    pub confirmed_at: DateTime<Utc>,
}

impl ConfirmationRecord {
    pub fn payment_details(&self) -> PaymentDetails {
        PaymentDetails {
            order_id: self.order_id.clone(),
            transaction_id: self.transaction_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            paid_at: self.confirmed_at,
        }
    }
}

/// Order details handed to the client for checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkout {
    pub order_id: String,
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
    pub purpose: OrderPurpose,
}

/// Result of presenting a verified payment.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome<T> {
    /// The effect ran for the first time.
    Applied(T),
    /// The order was already applied; current state is returned unchanged.
    AlreadyApplied(T),
}

impl<T> PaymentOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, PaymentOutcome::Applied(_))
    }

    pub fn value(&self) -> &T {
        match self {
            PaymentOutcome::Applied(v) | PaymentOutcome::AlreadyApplied(v) => v,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            PaymentOutcome::Applied(v) | PaymentOutcome::AlreadyApplied(v) => v,
        }
    }
}

fn check_order<P>(owner: &str, purpose: &OrderPurpose, student: &str, purpose_matches: P) -> Result<()>
where
    P: FnOnce(&OrderPurpose) -> bool,
{
    if owner != student {
        return Err(MarketplaceError::OrderMismatch(
            "order belongs to another user".into(),
        ));
    }
    if !purpose_matches(purpose) {
        return Err(MarketplaceError::OrderMismatch(
            "order was created for a different purchase".into(),
        ));
    }
    Ok(())
}

/// Apply `effect` for a verified payment at most once.
///
/// Must be called with `data` held under the write lock. Returns `None` when
/// a confirmation for the order already exists; the effect is not run. A
/// confirmed order moves from the pending book to the confirmation record.
pub(crate) fn apply_once<T, P, F>(
    data: &mut MarketplaceData,
    student: &str,
    payment: &VerifiedPayment,
    purpose_matches: P,
    effect: F,
) -> Result<Option<T>>
where
    P: FnOnce(&OrderPurpose) -> bool,
    F: FnOnce(&mut MarketplaceData, &PendingOrder) -> Result<T>,
{
    if let Some(record) = data.confirmations.get(payment.order_id()) {
        check_order(&record.student, &record.purpose, student, purpose_matches)?;
        debug!(order_id = %record.order_id, "Confirmation replayed, already applied");
        return Ok(None);
    }

    let order = data
        .pending_orders
        .get(payment.order_id())
        .cloned()
        .ok_or_else(|| MarketplaceError::OrderMismatch("unknown order".into()))?;
    check_order(&order.student, &order.purpose, student, purpose_matches)?;

    let value = effect(data, &order)?;

    data.pending_orders.remove(&order.order_id);
    data.confirmations.insert(
        order.order_id.clone(),
        ConfirmationRecord {
            order_id: order.order_id.clone(),
            transaction_id: payment.transaction_id().to_string(),
            student: order.student.clone(),
            purpose: order.purpose.clone(),
            amount: order.amount,
            currency: order.currency.clone(),
            confirmed_at: Utc::now(),
        },
    );

    info!(
        order_id = %order.order_id,
        transaction_id = %payment.transaction_id(),
        student = %order.student,
        amount = order.amount,
        "Payment applied"
    );
    Ok(Some(value))
}

impl Marketplace {
    /// Create a gateway order and remember what it pays for.
    pub(crate) async fn open_order(
        &self,
        student: &str,
        purpose: OrderPurpose,
        amount: u64,
    ) -> Result<Checkout> {
        let currency = self.pricing().currency.clone();
        let receipt = format!(
            "{}_{}",
            purpose.receipt_prefix(),
            uuid::Uuid::new_v4().simple()
        );

        // Gateway call happens outside the lock.
        let order = self
            .payments()
            .create_order(amount, &currency, &receipt)
            .await?;

        let pending = PendingOrder {
            order_id: order.id.clone(),
            student: student.to_string(),
            purpose: purpose.clone(),
            amount,
            currency: currency.clone(),
            receipt: receipt.clone(),
            created_at: Utc::now(),
        };

        self.mutate(|data| {
            data.pending_orders.insert(pending.order_id.clone(), pending);
            Ok(())
        })
        .await?;

        Ok(Checkout {
            order_id: order.id,
            amount,
            currency,
            receipt,
            purpose,
        })
    }

    /// Applied payments for one student, newest first.
    pub async fn payments_for_student(&self, student: &str) -> Vec<ConfirmationRecord> {
        let data = self.read().await;
        let mut records: Vec<_> = data
            .confirmations
            .values()
            .filter(|c| c.student == student)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.confirmed_at.cmp(&a.confirmed_at));
        records
    }

    /// All applied payments, newest first.
    pub async fn all_payments(&self) -> Vec<ConfirmationRecord> {
        let data = self.read().await;
        let mut records: Vec<_> = data.confirmations.values().cloned().collect();
        records.sort_by(|a, b| b.confirmed_at.cmp(&a.confirmed_at));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payment_gateway::{signature, PaymentConfirmation, PaymentVerifier};
    use secrecy::SecretString;

    const SECRET: &str = "order_test_secret";

    fn verified(order_id: &str, transaction_id: &str) -> VerifiedPayment {
        let verifier = PaymentVerifier::new(None, Some(SecretString::new(SECRET.into())));
        let sig = signature::sign(SECRET.as_bytes(), order_id, transaction_id).unwrap();
        verifier
            .verify(&PaymentConfirmation {
                order_id: order_id.into(),
                transaction_id: transaction_id.into(),
                signature: sig,
            })
            .unwrap()
    }

    fn data_with_order(order_id: &str, student: &str) -> MarketplaceData {
        let mut data = MarketplaceData::default();
        data.pending_orders.insert(
            order_id.into(),
            PendingOrder {
                order_id: order_id.into(),
                student: student.into(),
                purpose: OrderPurpose::HourPackage {
                    hours: Decimal::from(60),
                },
                amount: 100_000,
                currency: "INR".into(),
                receipt: "pkg_x".into(),
                created_at: Utc::now(),
            },
        );
        data
    }

    fn is_package(p: &OrderPurpose) -> bool {
        matches!(p, OrderPurpose::HourPackage { .. })
    }

    #[test]
    fn test_effect_runs_once() {
        let mut data = data_with_order("order_1", "s1");
        let payment = verified("order_1", "pay_1");
        let mut runs = 0;

        let first = apply_once(&mut data, "s1", &payment, is_package, |_, _| {
            runs += 1;
            Ok(())
        })
        .unwrap();
        assert!(first.is_some());

        let second = apply_once(&mut data, "s1", &payment, is_package, |_, _| {
            runs += 1;
            Ok(())
        })
        .unwrap();
        assert!(second.is_none());
        assert_eq!(runs, 1);
        assert_eq!(data.confirmations.len(), 1);
        assert!(data.pending_orders.is_empty());
    }

    #[test]
    fn test_replay_by_another_user_is_mismatch() {
        let mut data = data_with_order("order_1", "s1");
        let payment = verified("order_1", "pay_1");
        apply_once(&mut data, "s1", &payment, is_package, |_, _| Ok(())).unwrap();

        assert!(matches!(
            apply_once(&mut data, "s2", &payment, is_package, |_, _| Ok(())),
            Err(MarketplaceError::OrderMismatch(_))
        ));
        let wrong_flow = |p: &OrderPurpose| matches!(p, OrderPurpose::Certification { .. });
        assert!(matches!(
            apply_once(&mut data, "s1", &payment, wrong_flow, |_, _| Ok(())),
            Err(MarketplaceError::OrderMismatch(_))
        ));
    }

    #[test]
    fn test_failed_effect_records_nothing() {
        let mut data = data_with_order("order_1", "s1");
        let payment = verified("order_1", "pay_1");

        let result: Result<Option<()>> = apply_once(&mut data, "s1", &payment, is_package, |_, _| {
            Err(MarketplaceError::InvalidTransition("nope".into()))
        });
        assert!(result.is_err());
        assert!(data.confirmations.is_empty());
        assert!(data.pending_orders.contains_key("order_1"));
    }

    #[test]
    fn test_unknown_or_foreign_order_is_mismatch() {
        let mut data = data_with_order("order_1", "s1");

        let unknown = verified("order_2", "pay_1");
        assert!(matches!(
            apply_once(&mut data, "s1", &unknown, is_package, |_, _| Ok(())),
            Err(MarketplaceError::OrderMismatch(_))
        ));

        let payment = verified("order_1", "pay_1");
        assert!(matches!(
            apply_once(&mut data, "s2", &payment, is_package, |_, _| Ok(())),
            Err(MarketplaceError::OrderMismatch(_))
        ));

        let wrong_flow = |p: &OrderPurpose| matches!(p, OrderPurpose::Internship { .. });
        assert!(matches!(
            apply_once(&mut data, "s1", &payment, wrong_flow, |_, _| Ok(())),
            Err(MarketplaceError::OrderMismatch(_))
        ));
        assert!(data.confirmations.is_empty());
    }

    #[test]
    fn test_confirmation_record_carries_order_amount() {
        let mut data = data_with_order("order_1", "s1");
        let payment = verified("order_1", "pay_9");
        apply_once(&mut data, "s1", &payment, is_package, |_, _| Ok(())).unwrap();

        let record = &data.confirmations["order_1"];
        assert_eq!(record.amount, 100_000);
        assert_eq!(record.transaction_id, "pay_9");
        assert_eq!(record.payment_details().order_id, "order_1");
    }

    #[test]
    fn test_outcome_accessors() {
        let applied = PaymentOutcome::Applied(3);
        let replay = PaymentOutcome::AlreadyApplied(3);
        assert!(applied.is_applied());
        assert!(!replay.is_applied());
        assert_eq!(*replay.value(), 3);
        assert_eq!(applied.into_inner(), 3);
    }
}
