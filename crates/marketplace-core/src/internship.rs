//! Internship applications.
//!
//! ```text
//! pending ──(org selects)──▶ selected_pending_payment ──(verified payment)──▶ hired
//!    │                              │
//!    └──────────(org)───────────────┴──▶ rejected
//! ```
//!
//! `hired` is reachable only through a verified confirmation fee.

use crate::error::{MarketplaceError, Result};
use crate::marketplace::Marketplace;
use crate::orders::{apply_once, Checkout, OrderPurpose, PaymentOutcome};
use crate::store::MarketplaceData;
use crate::types::{
    new_id, Caller, InternshipApplication, InternshipStatus, ListingStatus, PaymentDetails,
};
use chrono::Utc;
use payment_gateway::PaymentConfirmation;
use tracing::info;

fn find_application<'a>(
    data: &'a MarketplaceData,
    application_id: &str,
) -> Result<&'a InternshipApplication> {
    data.internship_applications
        .get(application_id)
        .ok_or_else(|| MarketplaceError::NotFound(format!("internship application {}", application_id)))
}

/// Check an organization decision against the current state.
fn check_decision(from: InternshipStatus, to: InternshipStatus) -> Result<()> {
    use crate::types::InternshipStatus::*;
    match (from, to) {
        (Pending, SelectedPendingPayment) => Ok(()),
        (Pending | SelectedPendingPayment, Rejected) => Ok(()),
        (current, Hired) if current != Hired => Err(MarketplaceError::InvalidTransition(
            "hiring requires a verified payment".into(),
        )),
        (current, target) => Err(MarketplaceError::InvalidTransition(format!(
            "cannot move from {:?} to {:?}",
            current, target
        ))),
    }
}

impl Marketplace {
    /// Apply to an open internship listing.
    pub async fn apply_to_internship(
        &self,
        student: &str,
        internship_id: &str,
    ) -> Result<InternshipApplication> {
        self.mutate(|data| {
            let listing = data
                .internships
                .get(internship_id)
                .ok_or_else(|| MarketplaceError::NotFound(format!("internship {}", internship_id)))?;
            if listing.status != ListingStatus::Open {
                return Err(MarketplaceError::InvalidTransition(
                    "internship is closed".into(),
                ));
            }
            if data
                .internship_applications
                .values()
                .any(|a| a.student == student && a.internship == internship_id)
            {
                return Err(MarketplaceError::AlreadyAppliedToListing(
                    "already applied to this internship".into(),
                ));
            }

            let application = InternshipApplication {
                id: new_id(),
                student: student.to_string(),
                internship: internship_id.to_string(),
                status: InternshipStatus::Pending,
                payment: None,
                applied_at: Utc::now(),
            };
            data.internship_applications
                .insert(application.id.clone(), application.clone());
            Ok(application)
        })
        .await
    }

    /// Select or reject an applicant. Only the listing owner or an admin.
    pub async fn set_internship_status(
        &self,
        caller: &Caller,
        application_id: &str,
        status: InternshipStatus,
    ) -> Result<InternshipApplication> {
        let application = self
            .mutate(|data| {
                let application = find_application(data, application_id)?;
                let owner = data
                    .internships
                    .get(&application.internship)
                    .map(|l| l.organization.clone())
                    .ok_or_else(|| MarketplaceError::NotFound("internship listing".into()))?;
                if !caller.owns_or_admin(&owner) {
                    return Err(MarketplaceError::NotAuthorized(
                        "not the owner of this internship".into(),
                    ));
                }
                check_decision(application.status, status)?;

                let application = data
                    .internship_applications
                    .get_mut(application_id)
                    .ok_or_else(|| MarketplaceError::NotFound("internship application".into()))?;
                application.status = status;
                Ok(application.clone())
            })
            .await?;

        info!(
            application_id = %application.id,
            status = ?application.status,
            "Internship application updated"
        );
        Ok(application)
    }

    /// Open the confirmation-fee order for a selected applicant.
    pub async fn initiate_internship_payment(
        &self,
        student: &str,
        application_id: &str,
    ) -> Result<Checkout> {
        {
            let data = self.read().await;
            let application = find_application(&data, application_id)?;
            if application.student != student {
                return Err(MarketplaceError::NotAuthorized(
                    "not your application".into(),
                ));
            }
            if application.status != InternshipStatus::SelectedPendingPayment {
                return Err(MarketplaceError::InvalidTransition(
                    "application is not awaiting payment".into(),
                ));
            }
        }

        let purpose = OrderPurpose::Internship {
            application_id: application_id.to_string(),
        };
        self.open_order(student, purpose, self.pricing().internship_amount())
            .await
    }

    /// Verify the confirmation fee and mark the applicant hired, once.
    pub async fn confirm_internship_payment(
        &self,
        student: &str,
        application_id: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<PaymentOutcome<InternshipApplication>> {
        let payment = self.payments().verify(confirmation)?;

        let outcome = self
            .mutate(|data| {
                let applied = apply_once(
                    data,
                    student,
                    &payment,
                    |purpose| {
                        matches!(purpose, OrderPurpose::Internship { application_id: id } if id == application_id)
                    },
                    |data, order| {
                        let application = data
                            .internship_applications
                            .get_mut(application_id)
                            .ok_or_else(|| MarketplaceError::NotFound("internship application".into()))?;
                        if application.status != InternshipStatus::SelectedPendingPayment {
                            return Err(MarketplaceError::InvalidTransition(
                                "application is not awaiting payment".into(),
                            ));
                        }
                        application.status = InternshipStatus::Hired;
                        application.payment = Some(PaymentDetails {
                            order_id: order.order_id.clone(),
                            transaction_id: payment.transaction_id().to_string(),
                            amount: order.amount,
                            currency: order.currency.clone(),
                            paid_at: Utc::now(),
                        });
                        Ok(application.clone())
                    },
                )?;

                match applied {
                    Some(application) => Ok(PaymentOutcome::Applied(application)),
                    None => Ok(PaymentOutcome::AlreadyApplied(
                        find_application(data, application_id)?.clone(),
                    )),
                }
            })
            .await?;

        if outcome.is_applied() {
            info!(student = %student, application_id = %application_id, "Internship confirmed");
        }
        Ok(outcome)
    }

    pub async fn internship_applications_for_student(&self, student: &str) -> Vec<InternshipApplication> {
        let data = self.read().await;
        let mut applications: Vec<_> = data
            .internship_applications
            .values()
            .filter(|a| a.student == student)
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        applications
    }
}
