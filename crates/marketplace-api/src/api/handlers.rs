//! HTTP request handlers.
//!
//! Handlers check the caller's role; ownership of individual resources is
//! checked by the marketplace itself.

use super::auth::CallerIdentity;
use super::types::{
    ApiJson, ApplicationStatusRequest, CertificateResponse, HealthResponse,
    InternshipStatusRequest, IssueCertificateRequest, LedgerResponse, ListResponse,
    ProfileRequest, VerifyResponse,
};
use super::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Path, State},
    Json,
};
use marketplace_core::{
    Application, CertificateGrant, Certification, Checkout, ConfirmationRecord, HourLogEntry,
    InternshipApplication, InternshipListing, NewCertification, NewHourLog, NewInternship,
    NewOpportunity, Opportunity, PaymentOutcome, UserCertification, UserProfile,
};
use payment_gateway::PaymentConfirmation;
use tracing::info;

type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let marketplace = &state.marketplace;
    Json(HealthResponse {
        status: "ok".to_string(),
        payments_configured: marketplace.payments().is_configured(),
        stats: marketplace.stats().await,
    })
}

pub async fn update_profile(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(request): ApiJson<ProfileRequest>,
) -> ApiResult<UserProfile> {
    let profile = state
        .marketplace
        .upsert_profile(&identity.0, &request.name, &request.email)
        .await?;
    Ok(Json(profile))
}

// ---------------------------------------------------------------------------
// Ledger and hour packages
// ---------------------------------------------------------------------------

pub async fn get_ledger(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<LedgerResponse> {
    let student = identity.student()?;
    let ledger = state.marketplace.ledger(&student.id).await?;
    let approved = state
        .marketplace
        .approved_hours_for_student(&student.id)
        .await;

    let mut response = LedgerResponse::from(ledger);
    response.approved_hours = Some(approved);
    Ok(Json(response))
}

pub async fn purchase_package(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<Checkout> {
    let student = identity.student()?;
    let checkout = state.marketplace.purchase_package(&student.id).await?;
    Ok(Json(checkout))
}

pub async fn verify_package(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(confirmation): ApiJson<PaymentConfirmation>,
) -> ApiResult<VerifyResponse<LedgerResponse>> {
    let student = identity.student()?;
    let outcome = state
        .marketplace
        .confirm_package(&student.id, &confirmation)
        .await?;

    Ok(Json(VerifyResponse {
        applied: outcome.is_applied(),
        result: outcome.into_inner().into(),
    }))
}

// ---------------------------------------------------------------------------
// Hour logs
// ---------------------------------------------------------------------------

pub async fn submit_hours(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(log): ApiJson<NewHourLog>,
) -> ApiResult<HourLogEntry> {
    let student = identity.student()?;
    let entry = state.marketplace.submit_hours(&student.id, log).await?;
    Ok(Json(entry))
}

pub async fn my_hours(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<HourLogEntry>> {
    let student = identity.student()?;
    let logs = state.marketplace.logs_for_student(&student.id).await;
    Ok(Json(logs.into()))
}

pub async fn organization_hours(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<HourLogEntry>> {
    let reviewer = identity.reviewer()?;
    let logs = state.marketplace.logs_for_organization(&reviewer.id).await;
    Ok(Json(logs.into()))
}

pub async fn approve_hours(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(log_id): Path<String>,
) -> ApiResult<HourLogEntry> {
    let reviewer = identity.reviewer()?;
    let entry = state.marketplace.approve_log(reviewer, &log_id).await?;
    Ok(Json(entry))
}

pub async fn reject_hours(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(log_id): Path<String>,
) -> ApiResult<HourLogEntry> {
    let reviewer = identity.reviewer()?;
    let entry = state.marketplace.reject_log(reviewer, &log_id).await?;
    Ok(Json(entry))
}

// ---------------------------------------------------------------------------
// Opportunities
// ---------------------------------------------------------------------------

pub async fn create_opportunity(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(request): ApiJson<NewOpportunity>,
) -> ApiResult<Opportunity> {
    let organization = identity.reviewer()?;
    let opportunity = state
        .marketplace
        .create_opportunity(organization, request)
        .await?;
    Ok(Json(opportunity))
}

pub async fn apply_to_opportunity(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(opportunity_id): Path<String>,
) -> ApiResult<Application> {
    let student = identity.student()?;
    let application = state
        .marketplace
        .apply_to_opportunity(&student.id, &opportunity_id)
        .await?;
    Ok(Json(application))
}

pub async fn set_application_status(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(application_id): Path<String>,
    ApiJson(request): ApiJson<ApplicationStatusRequest>,
) -> ApiResult<Application> {
    let reviewer = identity.reviewer()?;
    let application = state
        .marketplace
        .set_application_status(reviewer, &application_id, request.status)
        .await?;
    Ok(Json(application))
}

// ---------------------------------------------------------------------------
// Internships
// ---------------------------------------------------------------------------

pub async fn create_internship(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(request): ApiJson<NewInternship>,
) -> ApiResult<InternshipListing> {
    let organization = identity.reviewer()?;
    let listing = state
        .marketplace
        .create_internship(organization, request)
        .await?;
    Ok(Json(listing))
}

pub async fn apply_to_internship(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(internship_id): Path<String>,
) -> ApiResult<InternshipApplication> {
    let student = identity.student()?;
    let application = state
        .marketplace
        .apply_to_internship(&student.id, &internship_id)
        .await?;
    Ok(Json(application))
}

pub async fn set_internship_status(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(application_id): Path<String>,
    ApiJson(request): ApiJson<InternshipStatusRequest>,
) -> ApiResult<InternshipApplication> {
    let reviewer = identity.reviewer()?;
    let application = state
        .marketplace
        .set_internship_status(reviewer, &application_id, request.status)
        .await?;
    Ok(Json(application))
}

pub async fn pay_internship(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(application_id): Path<String>,
) -> ApiResult<Checkout> {
    let student = identity.student()?;
    let checkout = state
        .marketplace
        .initiate_internship_payment(&student.id, &application_id)
        .await?;
    Ok(Json(checkout))
}

pub async fn verify_internship(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(application_id): Path<String>,
    ApiJson(confirmation): ApiJson<PaymentConfirmation>,
) -> ApiResult<VerifyResponse<InternshipApplication>> {
    let student = identity.student()?;
    let outcome = state
        .marketplace
        .confirm_internship_payment(&student.id, &application_id, &confirmation)
        .await?;

    Ok(Json(VerifyResponse {
        applied: outcome.is_applied(),
        result: outcome.into_inner(),
    }))
}

pub async fn my_internship_applications(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<InternshipApplication>> {
    let student = identity.student()?;
    let applications = state
        .marketplace
        .internship_applications_for_student(&student.id)
        .await;
    Ok(Json(applications.into()))
}

// ---------------------------------------------------------------------------
// Certifications and certificates
// ---------------------------------------------------------------------------

/// Render and mail a grant, unless it already has a document.
async fn deliver(state: &AppState, grant: CertificateGrant) -> Result<CertificateResponse, ApiError> {
    let total_hours = grant.context.total_hours;
    let certificate = if grant.record.certificate_url.is_some() {
        grant.record
    } else {
        state
            .marketplace
            .deliver_certificate(&grant, state.renderer.as_ref(), state.mailer.as_ref())
            .await?
    };

    Ok(CertificateResponse {
        certificate,
        total_hours,
    })
}

pub async fn create_certification(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(request): ApiJson<NewCertification>,
) -> ApiResult<Certification> {
    identity.admin()?;
    let certification = state.marketplace.create_certification(request).await?;
    Ok(Json(certification))
}

pub async fn pay_certification(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(certification_id): Path<String>,
) -> ApiResult<Checkout> {
    let student = identity.student()?;
    let checkout = state
        .marketplace
        .initiate_certification_payment(&student.id, &certification_id)
        .await?;
    Ok(Json(checkout))
}

pub async fn verify_certification(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(certification_id): Path<String>,
    ApiJson(confirmation): ApiJson<PaymentConfirmation>,
) -> ApiResult<VerifyResponse<CertificateResponse>> {
    let student = identity.student()?;
    let outcome = state
        .marketplace
        .confirm_certification_payment(&student.id, &certification_id, &confirmation)
        .await?;

    let applied = outcome.is_applied();
    let result = match outcome {
        PaymentOutcome::Applied(grant) | PaymentOutcome::AlreadyApplied(grant) => {
            deliver(&state, grant).await?
        }
    };
    Ok(Json(VerifyResponse { applied, result }))
}

pub async fn my_certifications(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<UserCertification>> {
    let student = identity.student()?;
    let records = state
        .marketplace
        .certifications_for_student(&student.id)
        .await;
    Ok(Json(records.into()))
}

pub async fn issue_certificate(
    State(state): State<AppState>,
    identity: CallerIdentity,
    ApiJson(request): ApiJson<IssueCertificateRequest>,
) -> ApiResult<CertificateResponse> {
    let reviewer = identity.reviewer()?;
    let grant = state
        .marketplace
        .issue_volunteer_certificate(reviewer, &request.student_id, &request.opportunity_id)
        .await?;

    // Re-issuing always renders a fresh document with the current hours.
    let certificate = state
        .marketplace
        .deliver_certificate(&grant, state.renderer.as_ref(), state.mailer.as_ref())
        .await?;

    info!(
        issuer = %reviewer.id,
        student = %request.student_id,
        certificate_id = %certificate.id,
        "Certificate delivered"
    );

    Ok(Json(CertificateResponse {
        certificate,
        total_hours: grant.context.total_hours,
    }))
}

// ---------------------------------------------------------------------------
// Payment records
// ---------------------------------------------------------------------------

pub async fn my_payments(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<ConfirmationRecord>> {
    let student = identity.student()?;
    let payments = state.marketplace.payments_for_student(&student.id).await;
    Ok(Json(payments.into()))
}

pub async fn all_payments(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<ListResponse<ConfirmationRecord>> {
    identity.admin()?;
    let payments = state.marketplace.all_payments().await;
    Ok(Json(payments.into()))
}
