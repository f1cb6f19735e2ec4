//! HTTP API for the marketplace.

pub mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{CallerIdentity, USER_ID_HEADER, USER_ROLE_HEADER};
pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use axum::{
    http::{header::InvalidHeaderValue, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch, post, put},
    Router,
};
use marketplace_core::{
    CertificateMailer, CertificateRenderer, LogMailer, Marketplace, TextCertificateRenderer,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub marketplace: Arc<Marketplace>,
    /// Turns a certificate grant into a document
    pub renderer: Arc<dyn CertificateRenderer>,
    /// Sends issued certificates to the student
    pub mailer: Arc<dyn CertificateMailer>,
}

impl AppState {
    pub fn new(
        marketplace: Arc<Marketplace>,
        renderer: Arc<dyn CertificateRenderer>,
        mailer: Arc<dyn CertificateMailer>,
    ) -> Self {
        Self {
            marketplace,
            renderer,
            mailer,
        }
    }

    /// State with the plain-text renderer and the logging mailer.
    pub fn with_defaults(marketplace: Arc<Marketplace>) -> Self {
        Self::new(
            marketplace,
            Arc::new(TextCertificateRenderer::default()),
            Arc::new(LogMailer),
        )
    }
}

/// CORS for a browser front end served from `origin`.
pub fn cors_layer(origin: &str) -> Result<CorsLayer, InvalidHeaderValue> {
    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers(Any))
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(120))
}

/// Create the API router with a custom rate limit.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/profile", put(handlers::update_profile))
        // Ledger and packages
        .route("/v1/ledger", get(handlers::get_ledger))
        .route("/v1/packages/purchase", post(handlers::purchase_package))
        .route("/v1/packages/verify", post(handlers::verify_package))
        // Hour logs
        .route(
            "/v1/hours",
            post(handlers::submit_hours).get(handlers::my_hours),
        )
        .route("/v1/ngo/hours", get(handlers::organization_hours))
        .route("/v1/hours/:id/approve", patch(handlers::approve_hours))
        .route("/v1/hours/:id/reject", patch(handlers::reject_hours))
        // Opportunities
        .route("/v1/opportunities", post(handlers::create_opportunity))
        .route(
            "/v1/opportunities/:id/apply",
            post(handlers::apply_to_opportunity),
        )
        .route(
            "/v1/applications/:id/status",
            put(handlers::set_application_status),
        )
        // Internships
        .route("/v1/internships", post(handlers::create_internship))
        .route(
            "/v1/internships/:id/apply",
            post(handlers::apply_to_internship),
        )
        .route(
            "/v1/internships/applications/mine",
            get(handlers::my_internship_applications),
        )
        .route(
            "/v1/internships/applications/:id/status",
            put(handlers::set_internship_status),
        )
        .route(
            "/v1/internships/applications/:id/pay",
            post(handlers::pay_internship),
        )
        .route(
            "/v1/internships/applications/:id/verify",
            post(handlers::verify_internship),
        )
        // Certifications
        .route("/v1/certifications", post(handlers::create_certification))
        .route("/v1/certifications/mine", get(handlers::my_certifications))
        .route(
            "/v1/certifications/:id/pay",
            post(handlers::pay_certification),
        )
        .route(
            "/v1/certifications/:id/verify",
            post(handlers::verify_certification),
        )
        .route("/v1/certificates/issue", post(handlers::issue_certificate))
        // Payment records
        .route("/v1/payments", get(handlers::all_payments))
        .route("/v1/payments/mine", get(handlers::my_payments))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
