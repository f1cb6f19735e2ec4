//! Paid certification courses.

use crate::error::{MarketplaceError, Result};
use crate::issuance::{certification_context, CertificateGrant};
use crate::marketplace::Marketplace;
use crate::orders::{apply_once, Checkout, OrderPurpose, PaymentOutcome};
use crate::store::MarketplaceData;
use crate::types::{
    new_id, Certification, CertificationStatus, NewCertification, PaymentDetails, UserCertification,
};
use chrono::Utc;
use payment_gateway::PaymentConfirmation;
use tracing::info;

fn find_record<'a>(
    data: &'a MarketplaceData,
    student: &str,
    certification_id: &str,
) -> Option<&'a UserCertification> {
    data.user_certifications
        .values()
        .find(|c| c.student == student && c.certification.as_deref() == Some(certification_id))
}

fn active_certification<'a>(data: &'a MarketplaceData, certification_id: &str) -> Result<&'a Certification> {
    data.certifications
        .get(certification_id)
        .filter(|c| c.active)
        .ok_or_else(|| MarketplaceError::NotFound(format!("certification {}", certification_id)))
}

impl Marketplace {
    pub async fn create_certification(&self, new: NewCertification) -> Result<Certification> {
        let title = new.title.trim().to_string();
        if title.is_empty() {
            return Err(MarketplaceError::InvalidInput("title is required".into()));
        }
        if new.price == 0 {
            return Err(MarketplaceError::InvalidInput(
                "price must be positive".into(),
            ));
        }

        let certification = Certification {
            id: new_id(),
            title,
            provider: new.provider.filter(|p| !p.trim().is_empty()),
            description: new.description,
            price: new.price,
            active: true,
            created_at: Utc::now(),
        };
        self.mutate(|data| {
            data.certifications
                .insert(certification.id.clone(), certification.clone());
            Ok(certification)
        })
        .await
    }

    /// Open an order for a certification the student has not completed.
    pub async fn initiate_certification_payment(
        &self,
        student: &str,
        certification_id: &str,
    ) -> Result<Checkout> {
        let price = {
            let data = self.read().await;
            let certification = active_certification(&data, certification_id)?;
            if find_record(&data, student, certification_id)
                .is_some_and(|r| r.status == CertificationStatus::Completed)
            {
                return Err(MarketplaceError::AlreadyEnrolled(
                    "certification already completed".into(),
                ));
            }
            certification.price
        };

        let purpose = OrderPurpose::Certification {
            certification_id: certification_id.to_string(),
        };
        self.open_order(student, purpose, self.pricing().to_minor(price))
            .await
    }

    /// Verify a certification payment, complete the record once and
    /// return the issuance context.
    pub async fn confirm_certification_payment(
        &self,
        student: &str,
        certification_id: &str,
        confirmation: &PaymentConfirmation,
    ) -> Result<PaymentOutcome<CertificateGrant>> {
        let payment = self.payments().verify(confirmation)?;

        let outcome = self
            .mutate(|data| {
                let applied = apply_once(
                    data,
                    student,
                    &payment,
                    |purpose| {
                        matches!(purpose, OrderPurpose::Certification { certification_id: id } if id == certification_id)
                    },
                    |data, order| {
                        let certification = data
                            .certifications
                            .get(certification_id)
                            .cloned()
                            .ok_or_else(|| MarketplaceError::NotFound(format!("certification {}", certification_id)))?;
                        let now = Utc::now();
                        let details = PaymentDetails {
                            order_id: order.order_id.clone(),
                            transaction_id: payment.transaction_id().to_string(),
                            amount: order.amount,
                            currency: order.currency.clone(),
                            paid_at: now,
                        };

                        let existing = data.user_certifications.values_mut().find(|c| {
                            c.student == student
                                && c.certification.as_deref() == Some(certification_id)
                        });
                        let record = match existing {
                            Some(record) => {
                                record.status = CertificationStatus::Completed;
                                record.payment = Some(details);
                                record.completed_at = Some(now);
                                record.clone()
                            }
                            None => {
                                let record = UserCertification {
                                    id: new_id(),
                                    student: student.to_string(),
                                    certification: Some(certification_id.to_string()),
                                    opportunity: None,
                                    status: CertificationStatus::Completed,
                                    payment: Some(details),
                                    certificate_url: None,
                                    applied_at: now,
                                    completed_at: Some(now),
                                };
                                data.user_certifications
                                    .insert(record.id.clone(), record.clone());
                                record
                            }
                        };

                        let context = certification_context(data, student, &certification);
                        Ok(CertificateGrant { record, context })
                    },
                )?;

                match applied {
                    Some(grant) => Ok(PaymentOutcome::Applied(grant)),
                    None => {
                        let certification = data
                            .certifications
                            .get(certification_id)
                            .ok_or_else(|| MarketplaceError::NotFound(format!("certification {}", certification_id)))?;
                        let record = find_record(data, student, certification_id)
                            .cloned()
                            .ok_or_else(|| MarketplaceError::Internal("confirmed certification has no record".into()))?;
                        let context = certification_context(data, student, certification);
                        Ok(PaymentOutcome::AlreadyApplied(CertificateGrant { record, context }))
                    }
                }
            })
            .await?;

        if outcome.is_applied() {
            info!(
                student = %student,
                certification_id = %certification_id,
                "Certification purchased"
            );
        }
        Ok(outcome)
    }

    /// All certificate records held by a student, purchased or issued.
    pub async fn certifications_for_student(&self, student: &str) -> Vec<UserCertification> {
        let data = self.read().await;
        let mut records: Vec<_> = data
            .user_certifications
            .values()
            .filter(|c| c.student == student)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        records
    }
}
