//! Certificate issuance gate and delivery.
//!
//! A volunteer certificate is only issued once the student has approved
//! hours on the opportunity. Rendering and mailing are injected so the
//! document format and mail transport stay outside the core.

use crate::error::{MarketplaceError, Result};
use crate::journal::approved_hours;
use crate::marketplace::Marketplace;
use crate::store::MarketplaceData;
use crate::types::{
    new_id, Caller, Certification, CertificationStatus, UserCertification,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Organization name printed when none is known.
pub const DEFAULT_ORGANIZATION: &str = "GETSERVE.in";

const DEFAULT_LOCATION: &str = "Remote";

/// Everything a certificate document needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuanceContext {
    pub student_name: String,
    pub student_email: Option<String>,
    pub title: String,
    pub total_hours: Option<Decimal>,
    pub date_text: String,
    pub location: String,
    pub organization_name: String,
    pub issue_date: NaiveDate,
}

/// A completed certificate record and the context to render it with.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateGrant {
    pub record: UserCertification,
    pub context: IssuanceContext,
}

/// Rendered document plus the location it is served from.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCertificate {
    pub url: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[cfg_attr(test, mockall::automock)]
pub trait CertificateRenderer: Send + Sync {
    fn render(
        &self,
        record: &UserCertification,
        context: &IssuanceContext,
    ) -> Result<RenderedCertificate>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateMailer: Send + Sync {
    async fn send(&self, context: &IssuanceContext, certificate: &RenderedCertificate) -> Result<()>;
}

/// Plain-text certificate.
pub struct TextCertificateRenderer {
    url_prefix: String,
}

impl TextCertificateRenderer {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
        }
    }
}

impl Default for TextCertificateRenderer {
    fn default() -> Self {
        Self::new("/certificates")
    }
}

impl CertificateRenderer for TextCertificateRenderer {
    fn render(
        &self,
        record: &UserCertification,
        context: &IssuanceContext,
    ) -> Result<RenderedCertificate> {
        let text = format!(
            "CERTIFICATE OF COMPLETION\n\n\
             This certifies that {}\n\
             has successfully completed {}\n\
             {}\n\
             {}\n\n\
             Issued by {} on {}\n\
             Certificate ID: {}\n",
            context.student_name,
            context.title,
            context.date_text,
            context.location,
            context.organization_name,
            context.issue_date.format("%d %B %Y"),
            record.id,
        );
        Ok(RenderedCertificate {
            url: format!("{}/{}.txt", self.url_prefix, record.id),
            content_type: "text/plain".to_string(),
            content: text.into_bytes(),
        })
    }
}

/// Mailer that only logs.
pub struct LogMailer;

#[async_trait]
impl CertificateMailer for LogMailer {
    async fn send(&self, context: &IssuanceContext, certificate: &RenderedCertificate) -> Result<()> {
        info!(
            to = ?context.student_email,
            title = %context.title,
            url = %certificate.url,
            bytes = certificate.content.len(),
            "Certificate mail (log only)"
        );
        Ok(())
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

fn student_identity(data: &MarketplaceData, student: &str) -> (String, Option<String>) {
    match data.profiles.get(student) {
        Some(profile) => (profile.name.clone(), Some(profile.email.clone())),
        None => (student.to_string(), None),
    }
}

/// Check the approved-hours gate and build the volunteer certificate context.
pub(crate) fn authorize(data: &MarketplaceData, student: &str, opportunity_id: &str) -> Result<IssuanceContext> {
    let opportunity = data
        .opportunities
        .get(opportunity_id)
        .ok_or_else(|| MarketplaceError::NotFound(format!("opportunity {}", opportunity_id)))?;

    let hours = approved_hours(data, student, opportunity_id);
    if hours <= Decimal::ZERO {
        return Err(MarketplaceError::NoApprovedHours);
    }

    let date_text = match (opportunity.start_date, opportunity.end_date) {
        (Some(start), Some(end)) => format!(
            "{} - {} ({} Hours)",
            format_date(start),
            format_date(end),
            hours
        ),
        _ => format!("{} Hours", hours),
    };
    let organization_name = data
        .profiles
        .get(&opportunity.organization)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string());
    let (student_name, student_email) = student_identity(data, student);

    Ok(IssuanceContext {
        student_name,
        student_email,
        title: opportunity.title.clone(),
        total_hours: Some(hours),
        date_text,
        location: opportunity
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        organization_name,
        issue_date: Utc::now().date_naive(),
    })
}

/// Context for a purchased certification course.
pub(crate) fn certification_context(
    data: &MarketplaceData,
    student: &str,
    certification: &Certification,
) -> IssuanceContext {
    let (student_name, student_email) = student_identity(data, student);
    IssuanceContext {
        student_name,
        student_email,
        title: certification.title.clone(),
        total_hours: None,
        date_text: "Self-Paced".to_string(),
        location: "Online".to_string(),
        organization_name: certification
            .provider
            .clone()
            .unwrap_or_else(|| DEFAULT_ORGANIZATION.to_string()),
        issue_date: Utc::now().date_naive(),
    }
}

impl Marketplace {
    /// Check whether a volunteer certificate may be issued.
    pub async fn authorize_issuance(&self, student: &str, opportunity: &str) -> Result<IssuanceContext> {
        authorize(&*self.read().await, student, opportunity)
    }

    /// Issue (or re-issue in place) a volunteer certificate.
    pub async fn issue_volunteer_certificate(
        &self,
        caller: &Caller,
        student: &str,
        opportunity_id: &str,
    ) -> Result<CertificateGrant> {
        let grant = self
            .mutate(|data| {
                let owner = data
                    .opportunities
                    .get(opportunity_id)
                    .map(|o| o.organization.clone())
                    .ok_or_else(|| MarketplaceError::NotFound(format!("opportunity {}", opportunity_id)))?;
                if !caller.owns_or_admin(&owner) {
                    return Err(MarketplaceError::NotAuthorized(
                        "not the owner of this opportunity".into(),
                    ));
                }

                let context = authorize(data, student, opportunity_id)?;
                let now = Utc::now();

                let existing = data.user_certifications.values_mut().find(|c| {
                    c.student == student && c.opportunity.as_deref() == Some(opportunity_id)
                });
                let record = match existing {
                    Some(record) => {
                        record.status = CertificationStatus::Completed;
                        record.completed_at = Some(now);
                        record.clone()
                    }
                    None => {
                        let record = UserCertification {
                            id: new_id(),
                            student: student.to_string(),
                            certification: None,
                            opportunity: Some(opportunity_id.to_string()),
                            status: CertificationStatus::Completed,
                            payment: None,
                            certificate_url: None,
                            applied_at: now,
                            completed_at: Some(now),
                        };
                        data.user_certifications
                            .insert(record.id.clone(), record.clone());
                        record
                    }
                };

                Ok(CertificateGrant { record, context })
            })
            .await?;

        info!(
            student = %student,
            opportunity = %opportunity_id,
            certificate_id = %grant.record.id,
            "Volunteer certificate issued"
        );
        Ok(grant)
    }

    /// Attach the rendered document location to a certificate record.
    pub async fn record_certificate_url(&self, record_id: &str, url: &str) -> Result<UserCertification> {
        self.mutate(|data| {
            let record = data
                .user_certifications
                .get_mut(record_id)
                .ok_or_else(|| MarketplaceError::NotFound(format!("certificate {}", record_id)))?;
            record.certificate_url = Some(url.to_string());
            Ok(record.clone())
        })
        .await
    }

    /// Render, record and mail a granted certificate.
    ///
    /// The grant is already durable. Mail failures are logged and do not
    /// fail delivery.
    pub async fn deliver_certificate(
        &self,
        grant: &CertificateGrant,
        renderer: &dyn CertificateRenderer,
        mailer: &dyn CertificateMailer,
    ) -> Result<UserCertification> {
        let rendered = renderer.render(&grant.record, &grant.context)?;
        let record = self
            .record_certificate_url(&grant.record.id, &rendered.url)
            .await?;

        if let Err(e) = mailer.send(&grant.context, &rendered).await {
            warn!(
                certificate_id = %record.id,
                "Failed to send certificate mail: {}",
                e
            );
        }
        Ok(record)
    }
}
