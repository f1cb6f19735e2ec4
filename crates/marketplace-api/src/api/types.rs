//! API request and response types.

use crate::error::ApiError;
use axum::extract::FromRequest;
use marketplace_core::{
    ApplicationStatus, HourCreditLedger, InternshipStatus, LedgerStatus, MarketplaceStats,
    UserCertification,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// JSON body whose rejections use the API error format.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub payments_configured: bool,
    pub stats: MarketplaceStats,
}

/// Request to set the caller's display name and email.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileRequest {
    pub name: String,
    pub email: String,
}

/// Ledger balance as seen by the student.
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub student: String,
    pub total_hours: Decimal,
    pub hours_used: Decimal,
    pub remaining_hours: Decimal,
    pub status: LedgerStatus,
    pub transactions: usize,
    /// Hours approved across all opportunities. Only set on balance queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_hours: Option<Decimal>,
}

impl From<HourCreditLedger> for LedgerResponse {
    fn from(ledger: HourCreditLedger) -> Self {
        Self {
            approved_hours: None,
            remaining_hours: ledger.remaining(),
            student: ledger.student,
            total_hours: ledger.total_hours,
            hours_used: ledger.hours_used,
            status: ledger.status,
            transactions: ledger.transactions.len(),
        }
    }
}

/// Response to any payment verification.
///
/// `applied` is false when the same order had already been confirmed; the
/// current state is returned either way.
#[derive(Debug, Serialize)]
pub struct VerifyResponse<T> {
    pub applied: bool,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationStatusRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InternshipStatusRequest {
    pub status: InternshipStatus,
}

/// NGO request to issue a volunteer certificate.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueCertificateRequest {
    pub student_id: String,
    pub opportunity_id: String,
}

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub certificate: UserCertification,
    pub total_hours: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}
