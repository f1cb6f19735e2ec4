//! Hour-credit ledger.
//!
//! A ledger tracks purchased (`total_hours`) against consumed (`hours_used`)
//! volunteering hours. Hours are reserved when a log is submitted and given
//! back when the log is rejected.
//!
//! The free functions here operate on a [`MarketplaceData`] that the caller
//! already holds under the write lock, so every check-and-apply is atomic.

use crate::error::{MarketplaceError, Result};
use crate::store::MarketplaceData;
use crate::types::{HourCreditLedger, LedgerStatus, LedgerTransaction};
use chrono::Utc;
use rust_decimal::Decimal;

impl HourCreditLedger {
    /// A fresh ledger: nothing purchased, nothing used.
    pub fn new(student: String) -> Self {
        let now = Utc::now();
        Self {
            student,
            total_hours: Decimal::ZERO,
            hours_used: Decimal::ZERO,
            status: LedgerStatus::Exhausted,
            transactions: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Hours still available, never negative.
    pub fn remaining(&self) -> Decimal {
        (self.total_hours - self.hours_used).max(Decimal::ZERO)
    }

    /// Derive status from the balance. An expired ledger stays expired.
    pub fn recompute_status(&mut self) {
        if self.status == LedgerStatus::Expired {
            return;
        }
        if self.total_hours > Decimal::ZERO && self.hours_used >= self.total_hours {
            self.status = LedgerStatus::Exhausted;
        } else if self.hours_used < self.total_hours {
            self.status = LedgerStatus::Active;
        }
    }

    /// Whether `hours` can be reserved right now.
    pub fn can_debit(&self, hours: Decimal) -> bool {
        self.status == LedgerStatus::Active && self.hours_used + hours <= self.total_hours
    }

    fn apply_credit(&mut self, transaction: LedgerTransaction) {
        self.total_hours += transaction.hours_added;
        self.transactions.push(transaction);
        self.touch();
    }

    fn apply_debit(&mut self, hours: Decimal) -> Result<()> {
        if !self.can_debit(hours) {
            return Err(MarketplaceError::InsufficientBalance {
                requested: hours,
                available: self.remaining(),
            });
        }
        self.hours_used += hours;
        self.touch();
        Ok(())
    }

    fn apply_refund(&mut self, hours: Decimal) {
        self.hours_used = (self.hours_used - hours).max(Decimal::ZERO);
        self.touch();
    }

    fn touch(&mut self) {
        self.recompute_status();
        self.last_updated = Utc::now();
    }
}

/// Fetch the student's ledger, creating an empty one if absent.
pub fn get_or_create<'a>(data: &'a mut MarketplaceData, student: &str) -> &'a mut HourCreditLedger {
    data.ledgers
        .entry(student.to_string())
        .or_insert_with(|| HourCreditLedger::new(student.to_string()))
}

/// Add purchased hours and record the transaction.
pub fn credit(
    data: &mut MarketplaceData,
    student: &str,
    transaction: LedgerTransaction,
) -> Result<HourCreditLedger> {
    if transaction.hours_added <= Decimal::ZERO {
        return Err(MarketplaceError::InvalidInput(
            "credited hours must be positive".into(),
        ));
    }
    let ledger = get_or_create(data, student);
    ledger.apply_credit(transaction);
    Ok(ledger.clone())
}

/// Reserve hours. Fails without touching the ledger if it cannot cover them.
pub fn debit(data: &mut MarketplaceData, student: &str, hours: Decimal) -> Result<HourCreditLedger> {
    if hours <= Decimal::ZERO {
        return Err(MarketplaceError::InvalidInput(
            "debited hours must be positive".into(),
        ));
    }
    let ledger = data
        .ledgers
        .get_mut(student)
        .ok_or_else(|| MarketplaceError::InsufficientBalance {
            requested: hours,
            available: Decimal::ZERO,
        })?;
    ledger.apply_debit(hours)?;
    Ok(ledger.clone())
}

/// Give back previously reserved hours, flooring usage at zero.
pub fn refund(data: &mut MarketplaceData, student: &str, hours: Decimal) -> HourCreditLedger {
    let ledger = get_or_create(data, student);
    ledger.apply_refund(hours);
    ledger.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(hours: i64) -> LedgerTransaction {
        LedgerTransaction {
            payment_ref: "pay_1".into(),
            order_id: "order_1".into(),
            amount: 100_000,
            currency: "INR".into(),
            hours_added: Decimal::from(hours),
            timestamp: Utc::now(),
        }
    }

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_new_ledger_is_exhausted() {
        let mut data = MarketplaceData::default();
        let ledger = get_or_create(&mut data, "s1");
        assert_eq!(ledger.status, LedgerStatus::Exhausted);
        assert_eq!(ledger.total_hours, Decimal::ZERO);
        assert_eq!(ledger.remaining(), Decimal::ZERO);
    }

    #[test]
    fn test_credit_activates() {
        let mut data = MarketplaceData::default();
        let ledger = credit(&mut data, "s1", purchase(60)).unwrap();
        assert_eq!(ledger.status, LedgerStatus::Active);
        assert_eq!(ledger.total_hours, Decimal::from(60));
        assert_eq!(ledger.transactions.len(), 1);
    }

    #[test]
    fn test_debit_to_exact_total_exhausts() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(10)).unwrap();

        let ledger = debit(&mut data, "s1", dec("10")).unwrap();
        assert_eq!(ledger.status, LedgerStatus::Exhausted);
        assert_eq!(ledger.remaining(), Decimal::ZERO);
    }

    #[test]
    fn test_overdraft_leaves_ledger_unchanged() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(60)).unwrap();
        debit(&mut data, "s1", dec("59")).unwrap();
        let before = data.ledgers.get("s1").cloned();

        let err = debit(&mut data, "s1", dec("2")).unwrap_err();
        match err {
            MarketplaceError::InsufficientBalance {
                requested,
                available,
            } => {
                assert_eq!(requested, dec("2"));
                assert_eq!(available, dec("1"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(data.ledgers.get("s1").cloned(), before);
    }

    #[test]
    fn test_debit_without_ledger_fails() {
        let mut data = MarketplaceData::default();
        assert!(matches!(
            debit(&mut data, "nobody", dec("1")),
            Err(MarketplaceError::InsufficientBalance { .. })
        ));
        assert!(data.ledgers.is_empty());
    }

    #[test]
    fn test_debit_on_exhausted_ledger_fails() {
        let mut data = MarketplaceData::default();
        get_or_create(&mut data, "s1");
        assert!(debit(&mut data, "s1", dec("0.5")).is_err());
    }

    #[test]
    fn test_refund_restores_and_reactivates() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(5)).unwrap();
        debit(&mut data, "s1", dec("5")).unwrap();

        let ledger = refund(&mut data, "s1", dec("2.5"));
        assert_eq!(ledger.hours_used, dec("2.5"));
        assert_eq!(ledger.status, LedgerStatus::Active);
    }

    #[test]
    fn test_refund_floors_at_zero() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(5)).unwrap();
        debit(&mut data, "s1", dec("1")).unwrap();

        let ledger = refund(&mut data, "s1", dec("3"));
        assert_eq!(ledger.hours_used, Decimal::ZERO);
    }

    #[test]
    fn test_expired_is_sticky() {
        let mut ledger = HourCreditLedger::new("s1".into());
        ledger.total_hours = Decimal::from(10);
        ledger.status = LedgerStatus::Expired;
        ledger.recompute_status();
        assert_eq!(ledger.status, LedgerStatus::Expired);
        assert!(!ledger.can_debit(Decimal::ONE));
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(5)).unwrap();
        assert!(matches!(
            debit(&mut data, "s1", Decimal::ZERO),
            Err(MarketplaceError::InvalidInput(_))
        ));
        assert!(matches!(
            credit(&mut data, "s1", purchase(0)),
            Err(MarketplaceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_balance_never_negative_over_mixed_sequence() {
        let mut data = MarketplaceData::default();
        credit(&mut data, "s1", purchase(8)).unwrap();

        let steps = ["3", "2.5", "4", "1", "0.5", "2"];
        for (i, step) in steps.iter().enumerate() {
            let _ = debit(&mut data, "s1", dec(step));
            if i % 2 == 1 {
                refund(&mut data, "s1", dec("1"));
            }
            let ledger = &data.ledgers["s1"];
            assert!(ledger.hours_used >= Decimal::ZERO);
            assert!(ledger.hours_used <= ledger.total_hours);
        }
    }
}
